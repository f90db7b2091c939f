// ── Controller registry ──
//
// Composes every typed controller behind `AnyController` and enforces
// exclusive ownership: each object type, status category and log
// interface belongs to exactly one controller, so every id does too.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use futures_util::future::join_all;
use tracing::{debug, info};

use vantage_api::{Event, EventKind, SubscriptionHandle};

use crate::controller::{AnyController, SharedCallback};
use crate::error::CoreError;
use crate::model::{ObjectEvent, ObjectId, ObjectInfo, SystemObject};
use crate::query::ObjectFilter;

/// Counts from one catalog load across every controller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CatalogSummary {
    pub added: usize,
    pub removed: usize,
    /// Entries whose type no controller owns.
    pub ignored: usize,
}

/// One subscription per controller, removed together.
#[must_use = "dropping the handle keeps the subscription active but makes it impossible to remove"]
pub struct RegistrySubscription {
    handles: Vec<SubscriptionHandle>,
}

impl RegistrySubscription {
    /// Returns how many controller subscriptions were still active.
    pub fn unsubscribe(self) -> usize {
        self.handles
            .into_iter()
            .map(SubscriptionHandle::unsubscribe)
            .filter(|removed| *removed)
            .count()
    }
}

#[derive(Default)]
pub struct Registry {
    controllers: Vec<Arc<dyn AnyController>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a controller, rejecting any overlap with those already held.
    pub fn register(&mut self, controller: Arc<dyn AnyController>) -> Result<(), CoreError> {
        for existing in &self.controllers {
            let overlap = overlap(existing.object_types(), controller.object_types())
                .map(|t| format!("object type {t}"))
                .or_else(|| {
                    overlap(existing.status_categories(), controller.status_categories())
                        .map(|c| format!("status category {c}"))
                })
                .or_else(|| {
                    overlap(existing.log_interfaces(), controller.log_interfaces())
                        .map(|i| format!("log interface {i}"))
                });
            if let Some(what) = overlap {
                return Err(CoreError::Registry {
                    message: format!(
                        "{} and {} both claim {what}",
                        existing.name(),
                        controller.name()
                    ),
                });
            }
        }

        debug!(controller = controller.name(), "registered controller");
        self.controllers.push(controller);
        Ok(())
    }

    pub fn controllers(&self) -> &[Arc<dyn AnyController>] {
        &self.controllers
    }

    /// Hand each catalog entry to the one controller owning its type.
    ///
    /// Every controller sees the full set of its entries, so ids that
    /// vanished are pruned. An id listed twice is rejected before
    /// anything changes.
    pub fn load_catalog(
        &self,
        entries: impl IntoIterator<Item = ObjectInfo>,
    ) -> Result<CatalogSummary, CoreError> {
        let mut seen = HashSet::new();
        let mut per_controller: Vec<Vec<ObjectInfo>> = vec![Vec::new(); self.controllers.len()];
        let mut summary = CatalogSummary::default();

        for entry in entries {
            if !seen.insert(entry.id) {
                return Err(CoreError::Registry {
                    message: format!("object id {} appears more than once in the catalog", entry.id),
                });
            }
            let owner = self
                .controllers
                .iter()
                .position(|c| c.object_types().contains(&entry.object_type.as_str()));
            match owner.and_then(|i| per_controller.get_mut(i)) {
                Some(bucket) => bucket.push(entry),
                None => {
                    debug!(id = entry.id, object_type = %entry.object_type, "no controller for object type");
                    summary.ignored += 1;
                }
            }
        }

        for (controller, bucket) in self.controllers.iter().zip(per_controller) {
            let delta = controller.load_catalog(bucket);
            summary.added += delta.added.len();
            summary.removed += delta.removed.len();
        }

        info!(
            objects = self.len(),
            added = summary.added,
            removed = summary.removed,
            ignored = summary.ignored,
            "catalog applied"
        );
        Ok(summary)
    }

    // ── Events ───────────────────────────────────────────────────────

    /// The single controller declaring the event's category.
    pub fn route(&self, event: &Event) -> Option<&Arc<dyn AnyController>> {
        self.controllers.iter().find(|c| {
            let declared = match event.kind {
                EventKind::Status => c.status_categories(),
                EventKind::EnhancedLog => c.log_interfaces(),
            };
            declared.contains(&event.category.as_str())
        })
    }

    /// Route and apply. Returns `false` when no controller claims it.
    pub fn dispatch(&self, event: &Event) -> bool {
        match self.route(event) {
            Some(controller) => {
                controller.handle_event(event);
                true
            }
            None => false,
        }
    }

    // ── Lookup ───────────────────────────────────────────────────────

    pub fn get(&self, id: ObjectId) -> Option<Arc<SystemObject>> {
        self.controllers.iter().find_map(|c| c.get(id))
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.controllers.iter().any(|c| c.contains(id))
    }

    /// Name of the controller owning `id`.
    pub fn owner_of(&self, id: ObjectId) -> Option<&'static str> {
        self.controllers
            .iter()
            .find(|c| c.contains(id))
            .map(|c| c.name())
    }

    /// Every object of every controller, ordered by id.
    pub fn objects(&self) -> Vec<Arc<SystemObject>> {
        let by_id: BTreeMap<ObjectId, Arc<SystemObject>> = self
            .controllers
            .iter()
            .flat_map(|c| c.objects())
            .map(|o| (o.id, o))
            .collect();
        by_id.into_values().collect()
    }

    pub fn len(&self) -> usize {
        self.controllers.iter().map(|c| c.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.controllers.iter().all(|c| c.is_empty())
    }

    /// Subscribe to every controller at once.
    pub fn subscribe<F>(&self, callback: F) -> RegistrySubscription
    where
        F: Fn(&ObjectEvent) + Send + Sync + 'static,
    {
        let callback: SharedCallback = Arc::new(callback);
        let handles = self
            .controllers
            .iter()
            .map(|c| c.subscribe_shared(ObjectFilter::All, Arc::clone(&callback)))
            .collect();
        RegistrySubscription { handles }
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Initialize every controller concurrently. Their fetches interleave
    /// through the shared command FIFO. The first error is returned after
    /// all have finished.
    pub async fn initialize(&self, fetch_state: bool, monitor_state: bool) -> Result<(), CoreError> {
        let results = join_all(
            self.controllers
                .iter()
                .map(|c| c.initialize(fetch_state, monitor_state)),
        )
        .await;
        results.into_iter().collect()
    }

    /// Stop monitoring on every controller.
    pub async fn shutdown(&self) {
        join_all(self.controllers.iter().map(|c| c.shutdown())).await;
    }
}

/// First element present in both lists, case-insensitively.
fn overlap(a: &[&'static str], b: &[&'static str]) -> Option<&'static str> {
    a.iter()
        .find(|x| b.iter().any(|y| x.eq_ignore_ascii_case(y)))
        .copied()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    use pretty_assertions::assert_eq;
    use vantage_api::events::parse_line;
    use vantage_api::{CommandClient, ConnectionConfig, Connector, EventStream, ReconnectConfig};

    use crate::controller::{Blinds, Controller, ControllerKind, Loads, TemperatureSensors, Thermostats};

    fn offline<K: ControllerKind>(kind: K) -> Arc<dyn AnyController> {
        let connector = Connector::new(ConnectionConfig::new("127.0.0.1")).unwrap();
        let client = CommandClient::new(connector.clone(), Duration::from_secs(1));
        let stream = EventStream::new(connector, ReconnectConfig::default());
        Arc::new(Controller::new(kind, client, stream))
    }

    fn registry() -> Registry {
        let mut registry = Registry::new();
        registry.register(offline(Loads)).unwrap();
        registry.register(offline(Blinds)).unwrap();
        registry.register(offline(TemperatureSensors)).unwrap();
        registry.register(offline(Thermostats)).unwrap();
        registry
    }

    fn catalog() -> Vec<ObjectInfo> {
        vec![
            ObjectInfo::new(1, "Load"),
            ObjectInfo::new(2, "QISBlind"),
            ObjectInfo::new(10, "Temperature"),
            ObjectInfo::new(7, "Thermostat"),
            ObjectInfo::new(99, "Keypad"),
        ]
    }

    #[tokio::test]
    async fn overlapping_controllers_are_rejected() {
        let mut registry = registry();
        let err = registry.register(offline(Loads)).unwrap_err();
        assert!(matches!(err, CoreError::Registry { .. }), "got {err:?}");
        assert_eq!(registry.controllers().len(), 4);
    }

    #[tokio::test]
    async fn every_known_id_has_exactly_one_owner() {
        let registry = registry();
        let summary = registry.load_catalog(catalog()).unwrap();
        assert_eq!(
            summary,
            CatalogSummary {
                added: 4,
                removed: 0,
                ignored: 1
            }
        );

        for object in registry.objects() {
            let owners = registry
                .controllers()
                .iter()
                .filter(|c| c.contains(object.id))
                .count();
            assert_eq!(owners, 1, "id {}", object.id);
        }
        assert_eq!(registry.owner_of(2), Some("blinds"));
        assert_eq!(registry.owner_of(99), None);
        assert!(!registry.contains(99));
        assert_eq!(
            registry.objects().iter().map(|o| o.id).collect::<Vec<_>>(),
            vec![1, 2, 7, 10]
        );
    }

    #[tokio::test]
    async fn duplicate_catalog_ids_change_nothing() {
        let registry = registry();
        let err = registry
            .load_catalog([ObjectInfo::new(1, "Load"), ObjectInfo::new(1, "QISBlind")])
            .unwrap_err();
        assert!(matches!(err, CoreError::Registry { .. }));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn reload_moves_ids_between_controllers() {
        let registry = registry();
        registry.load_catalog(catalog()).unwrap();
        let summary = registry.load_catalog([ObjectInfo::new(1, "QISBlind")]).unwrap();

        assert_eq!(summary.added, 1);
        assert_eq!(summary.removed, 4);
        assert_eq!(registry.owner_of(1), Some("blinds"));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn events_route_by_kind_and_category() {
        let registry = registry();
        registry.load_catalog(catalog()).unwrap();

        let temp = parse_line("S:TEMP 10 19.000").unwrap().unwrap();
        assert_eq!(registry.route(&temp).map(|c| c.name()), Some("temperature_sensors"));

        let log = parse_line("EL: 7 Thermostat.GetIndoorTemperature 22.000").unwrap().unwrap();
        assert_eq!(registry.route(&log).map(|c| c.name()), Some("thermostats"));

        let keypad = parse_line("S:BTN 99 PRESS").unwrap().unwrap();
        assert!(!registry.dispatch(&keypad));

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let subscription = registry.subscribe(move |e| sink.lock().unwrap().push(e.object().id));

        assert!(registry.dispatch(&temp));
        assert!(registry.dispatch(&log));
        assert_eq!(*seen.lock().unwrap(), vec![10, 7]);
        assert_eq!(subscription.unsubscribe(), 4);

        assert!(registry.get(10).unwrap().attribute("value").is_some());
    }
}
