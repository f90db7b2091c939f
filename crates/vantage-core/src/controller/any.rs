use std::sync::Arc;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;

use vantage_api::{Event, SubscriptionHandle};

use super::{Controller, ControllerKind};
use crate::error::CoreError;
use crate::model::{ObjectEvent, ObjectId, ObjectInfo, SystemObject};
use crate::query::ObjectFilter;
use crate::store::CatalogDelta;

/// Callback shared across every controller of a registry subscription.
pub type SharedCallback = Arc<dyn Fn(&ObjectEvent) + Send + Sync>;

/// Object-safe face of [`Controller<K>`] so the registry can hold
/// heterogeneous controllers.
pub trait AnyController: Send + Sync {
    fn name(&self) -> &'static str;
    fn object_types(&self) -> &'static [&'static str];
    fn status_categories(&self) -> &'static [&'static str];
    fn log_interfaces(&self) -> &'static [&'static str];

    fn handles(&self, event: &Event) -> bool;
    fn handle_event(&self, event: &Event);
    fn load_catalog(&self, entries: Vec<ObjectInfo>) -> CatalogDelta;

    fn get(&self, id: ObjectId) -> Option<Arc<SystemObject>>;
    fn contains(&self, id: ObjectId) -> bool;
    fn objects(&self) -> Vec<Arc<SystemObject>>;
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool;

    fn subscribe_shared(&self, filter: ObjectFilter, callback: SharedCallback) -> SubscriptionHandle;

    fn initialize(&self, fetch_state: bool, monitor_state: bool) -> BoxFuture<'_, Result<(), CoreError>>;
    fn shutdown(&self) -> BoxFuture<'_, ()>;
}

impl<K: ControllerKind> AnyController for Controller<K> {
    fn name(&self) -> &'static str {
        K::NAME
    }

    fn object_types(&self) -> &'static [&'static str] {
        K::OBJECT_TYPES
    }

    fn status_categories(&self) -> &'static [&'static str] {
        K::STATUS_CATEGORIES
    }

    fn log_interfaces(&self) -> &'static [&'static str] {
        K::LOG_INTERFACES
    }

    fn handles(&self, event: &Event) -> bool {
        Controller::handles(self, event)
    }

    fn handle_event(&self, event: &Event) {
        Controller::handle_event(self, event);
    }

    fn load_catalog(&self, entries: Vec<ObjectInfo>) -> CatalogDelta {
        Controller::load_catalog(self, entries)
    }

    fn get(&self, id: ObjectId) -> Option<Arc<SystemObject>> {
        Controller::get(self, id)
    }

    fn contains(&self, id: ObjectId) -> bool {
        Controller::contains(self, id)
    }

    fn objects(&self) -> Vec<Arc<SystemObject>> {
        Controller::objects(self)
    }

    fn len(&self) -> usize {
        Controller::len(self)
    }

    fn is_empty(&self) -> bool {
        Controller::is_empty(self)
    }

    fn subscribe_shared(&self, filter: ObjectFilter, callback: SharedCallback) -> SubscriptionHandle {
        self.subscribe(filter, move |e| callback(e))
    }

    fn initialize(&self, fetch_state: bool, monitor_state: bool) -> BoxFuture<'_, Result<(), CoreError>> {
        Controller::initialize(self, fetch_state, monitor_state).boxed()
    }

    fn shutdown(&self) -> BoxFuture<'_, ()> {
        Controller::shutdown(self).boxed()
    }
}
