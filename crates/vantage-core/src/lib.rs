//! State-synchronisation layer between `vantage-api` and consumers.
//!
//! - **[`Vantage`]**: Facade owning one [`CommandClient`](vantage_api::CommandClient),
//!   one [`EventStream`](vantage_api::EventStream) and every typed controller.
//!   [`load_catalog()`](Vantage::load_catalog) supplies the `{id, type}` object
//!   list, [`initialize()`](Vantage::initialize) subscribes to pushes and
//!   fetches current state, [`close()`](Vantage::close) releases everything.
//!
//! - **[`Controller<K>`]**: Cache, diff and notification for one family of
//!   object types. The [`ControllerKind`] decides which catalog types and
//!   push categories it owns and how state is decoded and fetched.
//!   Subscribers only ever see real changes, as a [`ChangeSet`].
//!
//! - **[`Registry`]**: Type-erased [`AnyController`]s with exclusive
//!   ownership of object types and event categories, so every object id
//!   belongs to exactly one controller.
//!
//! - **[`ObjectCache`]** / **[`QueryView`]**: `DashMap`-backed storage of
//!   immutable [`SystemObject`] snapshots, and live filtered views over it.

pub mod config;
pub mod controller;
pub mod error;
pub mod model;
pub mod query;
pub mod registry;
pub mod store;
pub mod vantage;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{AuthCredentials, ClientConfig, TlsVerification};
pub use controller::kinds::LoadKind;
pub use controller::{
    AnyController, AttributeUpdate, BlindGroups, Blinds, Controller, ControllerKind,
    CurrentSensors, LoadGroups, Loads, RgbLoads, TemperatureSensors, Thermostats, Variables,
};
pub use error::CoreError;
pub use model::{ChangeSet, ObjectEvent, ObjectId, ObjectInfo, SystemObject, parse_catalog};
pub use query::{ObjectFilter, QueryView};
pub use registry::{CatalogSummary, Registry, RegistrySubscription};
pub use store::{CatalogDelta, ObjectCache};
pub use vantage::Vantage;

// Wire-level types consumers need alongside the cache.
pub use vantage_api::{ConnectionState, FixedPoint, Value};
