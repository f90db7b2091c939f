// ── Per-object-type controllers ──
//
// A `Controller<K>` owns the cache for the object types its `ControllerKind`
// declares. It merges fetched snapshots and event-stream deltas into that
// cache and notifies subscribers only when a value really changes.

mod any;
pub mod kinds;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use chrono::Utc;
use futures_util::future::BoxFuture;
use tokio::sync::{Mutex, broadcast};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use vantage_api::{
    CommandClient, DecodeError, Event, EventKind, EventStream, SubscriptionHandle, Subscribers,
    Value,
};

use crate::error::CoreError;
use crate::model::{ChangeSet, ObjectEvent, ObjectId, ObjectInfo, SystemObject};
use crate::query::{ObjectFilter, QueryView};
use crate::store::{CatalogDelta, ObjectCache};

pub use any::{AnyController, SharedCallback};
pub use kinds::{
    BlindGroups, Blinds, CurrentSensors, LoadGroups, Loads, RgbLoads, TemperatureSensors,
    Thermostats, Variables,
};

/// Enhanced-log type carrying object status lines.
const STATUS_LOG: &str = "STATUS";

/// One decoded attribute, or why it could not be decoded.
pub type AttributeUpdate = Result<(&'static str, Value), DecodeError>;

/// A fetch result: attribute values for one object.
pub type FetchResult<'a> = BoxFuture<'a, Result<Vec<(&'static str, Value)>, vantage_api::Error>>;

// ── ControllerKind ───────────────────────────────────────────────────

/// What a controller manages and how it reads state.
pub trait ControllerKind: Send + Sync + 'static {
    /// Used in logs and registry errors.
    const NAME: &'static str;
    /// Catalog object types this controller owns.
    const OBJECT_TYPES: &'static [&'static str];
    /// `S:<CATEGORY>` tags this controller consumes.
    const STATUS_CATEGORIES: &'static [&'static str] = &[];
    /// Interfaces whose enhanced-log lines this controller consumes.
    const LOG_INTERFACES: &'static [&'static str] = &[];

    /// Turn a routed event into attribute updates. Each entry decodes
    /// independently; failures are skipped by the caller.
    fn decode_event(&self, event: &Event) -> Vec<AttributeUpdate>;

    /// Query the object's current state through the command client.
    fn fetch_state<'a>(&'a self, client: &'a CommandClient, object: &'a SystemObject)
    -> FetchResult<'a>;
}

/// Whether a controller of kind `K` consumes `event`.
fn handles<K: ControllerKind>(event: &Event) -> bool {
    match event.kind {
        EventKind::Status => K::STATUS_CATEGORIES.contains(&event.category.as_str()),
        EventKind::EnhancedLog => K::LOG_INTERFACES.contains(&event.category.as_str()),
    }
}

// ── Controller ───────────────────────────────────────────────────────

/// Cache, diff and notification for one family of objects.
///
/// Cheaply cloneable via `Arc<ControllerInner>`.
pub struct Controller<K: ControllerKind> {
    inner: Arc<ControllerInner<K>>,
}

impl<K: ControllerKind> Clone for Controller<K> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct ControllerInner<K: ControllerKind> {
    kind: K,
    client: CommandClient,
    stream: EventStream,
    cache: Arc<ObjectCache>,
    subscribers: Arc<Subscribers<ObjectEvent>>,
    /// Present while subscribed to the event stream.
    monitor: Mutex<Option<Monitor>>,
    /// Serialises `initialize` calls.
    init_lock: Mutex<()>,
    initialized: AtomicBool,
}

struct Monitor {
    subscription: SubscriptionHandle,
    cancel: CancellationToken,
    resync_task: JoinHandle<()>,
}

impl<K: ControllerKind> Controller<K> {
    pub fn new(kind: K, client: CommandClient, stream: EventStream) -> Self {
        Self {
            inner: Arc::new(ControllerInner {
                kind,
                client,
                stream,
                cache: Arc::new(ObjectCache::new()),
                subscribers: Subscribers::new(K::NAME),
                monitor: Mutex::new(None),
                init_lock: Mutex::new(()),
                initialized: AtomicBool::new(false),
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        K::NAME
    }

    pub fn kind(&self) -> &K {
        &self.inner.kind
    }

    /// The shared command client, for typed operations on owned objects.
    pub fn client(&self) -> &CommandClient {
        &self.inner.client
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.initialized.load(Ordering::Acquire)
    }

    pub fn owns_type(&self, object_type: &str) -> bool {
        K::OBJECT_TYPES.contains(&object_type)
    }

    pub fn handles(&self, event: &Event) -> bool {
        handles::<K>(event)
    }

    // ── Reads ────────────────────────────────────────────────────────

    pub fn get(&self, id: ObjectId) -> Option<Arc<SystemObject>> {
        self.inner.cache.get(id)
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.inner.cache.contains(id)
    }

    pub fn len(&self) -> usize {
        self.inner.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.cache.is_empty()
    }

    pub fn objects(&self) -> Vec<Arc<SystemObject>> {
        self.inner.cache.snapshot()
    }

    pub fn cache(&self) -> &Arc<ObjectCache> {
        &self.inner.cache
    }

    /// Live view over every object.
    pub fn view(&self) -> QueryView {
        QueryView::new(Arc::clone(&self.inner.cache))
    }

    pub fn filter<P>(&self, predicate: P) -> QueryView
    where
        P: Fn(&SystemObject) -> bool + Send + Sync + 'static,
    {
        self.view().filter(predicate)
    }

    // ── Catalog ──────────────────────────────────────────────────────

    /// Replace the set of known objects with the entries of owned types.
    /// Known ids keep their attributes; missing ids are pruned.
    pub fn load_catalog(&self, entries: impl IntoIterator<Item = ObjectInfo>) -> CatalogDelta {
        let owned: Vec<ObjectInfo> = entries
            .into_iter()
            .filter(|e| self.owns_type(&e.object_type))
            .collect();
        let delta = self.inner.cache.apply_catalog(owned);

        for object in &delta.added {
            self.inner.subscribers.dispatch(&ObjectEvent::Added(Arc::clone(object)));
        }
        for object in &delta.removed {
            self.inner.subscribers.dispatch(&ObjectEvent::Removed(Arc::clone(object)));
        }

        info!(
            controller = K::NAME,
            objects = self.len(),
            added = delta.added.len(),
            removed = delta.removed.len(),
            "catalog loaded"
        );
        delta
    }

    // ── State ────────────────────────────────────────────────────────

    /// Merge `updates` into object `id`.
    ///
    /// Subscribers matching the object are told once, with only the
    /// attributes whose value differs. Returns that change set, or `None`
    /// when nothing changed or the id is unknown.
    pub fn update_state<I, S>(&self, id: ObjectId, updates: I) -> Option<ChangeSet>
    where
        I: IntoIterator<Item = (S, Value)>,
        S: Into<String>,
    {
        self.apply(id, updates, false)
    }

    fn apply<I, S>(&self, id: ObjectId, updates: I, fetched: bool) -> Option<ChangeSet>
    where
        I: IntoIterator<Item = (S, Value)>,
        S: Into<String>,
    {
        let updates = updates.into_iter().map(|(name, value)| (name.into(), value));
        let fetched_at = fetched.then(Utc::now);
        let (object, changes) = self.inner.cache.apply(id, updates, fetched_at)?;

        debug!(
            controller = K::NAME,
            id,
            changed = ?changes.names().collect::<Vec<_>>(),
            "object updated"
        );
        self.inner.subscribers.dispatch(&ObjectEvent::Updated {
            object,
            changes: changes.clone(),
        });
        Some(changes)
    }

    /// Apply one event from the stream.
    ///
    /// Foreign categories and unknown ids are ignored. An attribute that
    /// fails to decode is skipped; the rest still apply.
    pub fn handle_event(&self, event: &Event) {
        if !self.handles(event) {
            return;
        }
        if !self.contains(event.id) {
            trace!(controller = K::NAME, id = event.id, "event for unknown object");
            return;
        }

        let mut updates = Vec::new();
        for decoded in self.inner.kind.decode_event(event) {
            match decoded {
                Ok(update) => updates.push(update),
                Err(e) => warn!(
                    controller = K::NAME,
                    id = event.id,
                    category = %event.category,
                    error = %e,
                    "skipping undecodable attribute"
                ),
            }
        }
        if !updates.is_empty() {
            self.update_state(event.id, updates);
        }
    }

    /// Notify `callback` of added, updated and removed objects that match
    /// `filter`, until the handle is unsubscribed.
    pub fn subscribe<F>(&self, filter: ObjectFilter, callback: F) -> SubscriptionHandle
    where
        F: Fn(&ObjectEvent) + Send + Sync + 'static,
    {
        self.inner
            .subscribers
            .subscribe(move |e: &ObjectEvent| filter.matches(e.object()), callback)
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Subscribe to the event stream (if `monitor_state`) and then query
    /// every object (if `fetch_state`).
    ///
    /// Monitoring starts first so nothing pushed during the fetch window
    /// is missed; re-applying an equal value is a no-op.
    pub async fn initialize(&self, fetch_state: bool, monitor_state: bool) -> Result<(), CoreError> {
        let _guard = self.inner.init_lock.lock().await;

        if self.is_empty() {
            debug!(controller = K::NAME, "no objects, nothing to initialize");
        } else {
            if monitor_state {
                self.monitor_state().await;
            }
            if fetch_state {
                self.fetch_state().await?;
            }
        }

        self.inner.initialized.store(true, Ordering::Release);
        Ok(())
    }

    /// Query every object in id order through the shared command FIFO.
    ///
    /// A failing object is logged and skipped. Returns how many objects
    /// were fetched; fails only once the client is closed.
    pub async fn fetch_state(&self) -> Result<usize, CoreError> {
        let mut fetched = 0;
        for object in self.objects() {
            match self
                .inner
                .kind
                .fetch_state(&self.inner.client, &object)
                .await
            {
                Ok(attributes) => {
                    self.apply(object.id, attributes, true);
                    fetched += 1;
                }
                Err(vantage_api::Error::Closed) => return Err(CoreError::Closed),
                Err(e) => warn!(
                    controller = K::NAME,
                    id = object.id,
                    error = %e,
                    "state fetch failed, skipping object"
                ),
            }
        }

        info!(controller = K::NAME, fetched, total = self.len(), "fetched state");
        Ok(fetched)
    }

    /// Subscribe to the declared categories and re-fetch after every
    /// event-stream reconnect. Calling again is a no-op.
    pub async fn monitor_state(&self) {
        let mut monitor = self.inner.monitor.lock().await;
        if monitor.is_some() {
            return;
        }

        let stream = &self.inner.stream;
        for category in K::STATUS_CATEGORIES {
            stream.enable_status(category);
        }
        if !K::LOG_INTERFACES.is_empty() {
            stream.enable_enhanced_log(STATUS_LOG);
        }

        let weak = Arc::downgrade(&self.inner);
        let subscription = stream.subscribe(handles::<K>, move |event| {
            if let Some(inner) = weak.upgrade() {
                Controller { inner }.handle_event(event);
            }
        });

        // Subscribe before starting so the first resync cannot be missed.
        let resyncs = stream.resyncs();
        stream.start().await;

        let cancel = CancellationToken::new();
        let resync_task = tokio::spawn(resync_task(
            Arc::downgrade(&self.inner),
            resyncs,
            cancel.clone(),
        ));

        *monitor = Some(Monitor {
            subscription,
            cancel,
            resync_task,
        });
        info!(controller = K::NAME, "subscribed to state changes");
    }

    /// Stop monitoring. The event stream itself keeps running.
    pub async fn shutdown(&self) {
        let monitor = self.inner.monitor.lock().await.take();
        if let Some(Monitor {
            subscription,
            cancel,
            resync_task,
        }) = monitor
        {
            cancel.cancel();
            let _ = subscription.unsubscribe();
            if let Err(e) = resync_task.await {
                warn!(controller = K::NAME, error = %e, "resync task panicked");
            }
        }
    }
}

/// Re-fetch every time the event stream reports a reconnect. Events lost
/// during the outage are never replayed, so fetching is the only way back.
async fn resync_task<K: ControllerKind>(
    inner: Weak<ControllerInner<K>>,
    mut resyncs: broadcast::Receiver<u64>,
    cancel: CancellationToken,
) {
    loop {
        let received = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            r = resyncs.recv() => r,
        };
        match received {
            Ok(generation) => {
                debug!(controller = K::NAME, generation, "event stream resynchronized");
            }
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                debug!(controller = K::NAME, missed, "coalescing resync signals");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }

        let Some(inner) = inner.upgrade() else { break };
        let controller = Controller { inner };
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            result = controller.fetch_state() => {
                if let Err(e) = result {
                    warn!(controller = K::NAME, error = %e, "re-fetch after resync failed");
                }
            }
        }
    }
}
