// ── Catalog refresh ──
//
// Applies a full catalog snapshot to a cache: upsert every incoming entry,
// then prune ids that are no longer listed. Surviving objects keep their
// attribute values.

use std::collections::HashSet;
use std::sync::Arc;

use super::ObjectCache;
use crate::model::{ObjectId, ObjectInfo, SystemObject};

/// Objects a catalog load added or pruned.
#[derive(Debug, Clone, Default)]
pub struct CatalogDelta {
    pub added: Vec<Arc<SystemObject>>,
    pub removed: Vec<Arc<SystemObject>>,
}

impl CatalogDelta {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

impl ObjectCache {
    /// Upsert all entries, then remove ids missing from `entries`. This
    /// avoids the brief empty state a clear-then-insert would expose.
    pub(crate) fn apply_catalog(&self, entries: Vec<ObjectInfo>) -> CatalogDelta {
        let incoming: HashSet<ObjectId> = entries.iter().map(|e| e.id).collect();
        let mut delta = CatalogDelta::default();

        for info in entries {
            let (object, is_new) = self.upsert_info(info);
            if is_new {
                delta.added.push(object);
            }
        }
        for id in self.ids() {
            if !incoming.contains(&id) {
                if let Some(object) = self.remove(id) {
                    delta.removed.push(object);
                }
            }
        }

        delta
    }
}
