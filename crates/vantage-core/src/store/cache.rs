use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::watch;

use vantage_api::Value;

use crate::model::{ChangeSet, ObjectId, ObjectInfo, SystemObject};

/// Concurrent id → object map for one controller.
///
/// Readers get `Arc<SystemObject>` snapshots; writers replace the whole
/// `Arc` under the shard lock, so a reader sees either the old or the new
/// object and never a mix.
pub struct ObjectCache {
    objects: DashMap<ObjectId, Arc<SystemObject>>,

    /// Bumped on every mutation.
    version: watch::Sender<u64>,
}

impl ObjectCache {
    pub fn new() -> Self {
        let (version, _) = watch::channel(0u64);
        Self {
            objects: DashMap::new(),
            version,
        }
    }

    pub fn get(&self, id: ObjectId) -> Option<Arc<SystemObject>> {
        self.objects.get(&id).map(|r| Arc::clone(r.value()))
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.objects.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// All ids, ascending.
    pub fn ids(&self) -> Vec<ObjectId> {
        let mut ids: Vec<ObjectId> = self.objects.iter().map(|r| *r.key()).collect();
        ids.sort_unstable();
        ids
    }

    /// Current objects ordered by id.
    pub fn snapshot(&self) -> Vec<Arc<SystemObject>> {
        let mut objects: Vec<Arc<SystemObject>> =
            self.objects.iter().map(|r| Arc::clone(r.value())).collect();
        objects.sort_unstable_by_key(|o| o.id);
        objects
    }

    pub fn version(&self) -> u64 {
        *self.version.borrow()
    }

    /// Watch the version counter; it moves on every mutation.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.version.subscribe()
    }

    // ── Mutation ─────────────────────────────────────────────────────

    /// Insert a catalog entry or refresh the metadata of a known one.
    /// Returns the stored object and whether the id was new.
    pub(crate) fn upsert_info(&self, info: ObjectInfo) -> (Arc<SystemObject>, bool) {
        let id = info.id;
        let (object, is_new) = match self.objects.get(&id) {
            Some(existing) => (Arc::new(existing.refreshed(info)), false),
            None => (Arc::new(SystemObject::from_info(info)), true),
        };
        self.objects.insert(id, Arc::clone(&object));
        self.bump_version();
        (object, is_new)
    }

    pub(crate) fn remove(&self, id: ObjectId) -> Option<Arc<SystemObject>> {
        let removed = self.objects.remove(&id).map(|(_, v)| v);
        if removed.is_some() {
            self.bump_version();
        }
        removed
    }

    /// Merge `updates` into object `id` in one replace.
    ///
    /// Returns the new object and its change set when at least one value
    /// differs; `None` for unknown ids and no-op updates. `fetched_at`
    /// is recorded even when nothing changed.
    pub(crate) fn apply<I>(
        &self,
        id: ObjectId,
        updates: I,
        fetched_at: Option<DateTime<Utc>>,
    ) -> Option<(Arc<SystemObject>, ChangeSet)>
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        let mut entry = self.objects.get_mut(&id)?;
        let (mut next, changes) = entry.merged(updates);
        if changes.is_empty() && fetched_at.is_none() {
            return None;
        }
        if fetched_at.is_some() {
            next.fetched_at = fetched_at;
        }

        let next = Arc::new(next);
        *entry = Arc::clone(&next);
        drop(entry);
        self.bump_version();

        (!changes.is_empty()).then_some((next, changes))
    }

    fn bump_version(&self) {
        self.version.send_modify(|v| *v += 1);
    }
}

impl Default for ObjectCache {
    fn default() -> Self {
        Self::new()
    }
}
