// ── Vantage facade ──
//
// One command connection, one event connection and every typed controller,
// built from a single `ClientConfig`. Nothing is dialled until the first
// command or `initialize`.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info};

use vantage_api::{CommandClient, ConnectionState, Connector, EventStream};

use crate::config::ClientConfig;
use crate::controller::{
    BlindGroups, Blinds, Controller, CurrentSensors, LoadGroups, Loads, RgbLoads,
    TemperatureSensors, Thermostats, Variables,
};
use crate::error::CoreError;
use crate::model::{ObjectEvent, ObjectId, ObjectInfo, SystemObject};
use crate::registry::{CatalogSummary, Registry, RegistrySubscription};

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<VantageInner>`.
#[derive(Clone)]
pub struct Vantage {
    inner: Arc<VantageInner>,
}

struct VantageInner {
    config: ClientConfig,
    client: CommandClient,
    stream: EventStream,
    registry: Registry,
    loads: Controller<Loads>,
    load_groups: Controller<LoadGroups>,
    rgb_loads: Controller<RgbLoads>,
    blinds: Controller<Blinds>,
    blind_groups: Controller<BlindGroups>,
    temperature_sensors: Controller<TemperatureSensors>,
    current_sensors: Controller<CurrentSensors>,
    thermostats: Controller<Thermostats>,
    variables: Controller<Variables>,
}

impl Vantage {
    /// Build the client and controllers. Must be called inside a Tokio
    /// runtime; no connection is opened yet.
    pub fn new(config: ClientConfig) -> Result<Self, CoreError> {
        let connector = Connector::new(config.connection_config())?;
        let client = CommandClient::new(connector.clone(), config.request_timeout);
        let stream = EventStream::new(connector, config.reconnect.clone());

        let loads = Controller::new(Loads, client.clone(), stream.clone());
        let load_groups =
            Controller::new(LoadGroups::new(loads.clone()), client.clone(), stream.clone());
        let rgb_loads = Controller::new(RgbLoads, client.clone(), stream.clone());
        let blinds = Controller::new(Blinds, client.clone(), stream.clone());
        let blind_groups = Controller::new(BlindGroups, client.clone(), stream.clone());
        let temperature_sensors =
            Controller::new(TemperatureSensors, client.clone(), stream.clone());
        let current_sensors = Controller::new(CurrentSensors, client.clone(), stream.clone());
        let thermostats = Controller::new(Thermostats, client.clone(), stream.clone());
        let variables = Controller::new(Variables, client.clone(), stream.clone());

        let mut registry = Registry::new();
        registry.register(Arc::new(loads.clone()))?;
        registry.register(Arc::new(load_groups.clone()))?;
        registry.register(Arc::new(rgb_loads.clone()))?;
        registry.register(Arc::new(blinds.clone()))?;
        registry.register(Arc::new(blind_groups.clone()))?;
        registry.register(Arc::new(temperature_sensors.clone()))?;
        registry.register(Arc::new(current_sensors.clone()))?;
        registry.register(Arc::new(thermostats.clone()))?;
        registry.register(Arc::new(variables.clone()))?;

        debug!(host = %config.host, port = config.port(), "vantage client created");

        Ok(Self {
            inner: Arc::new(VantageInner {
                config,
                client,
                stream,
                registry,
                loads,
                load_groups,
                rgb_loads,
                blinds,
                blind_groups,
                temperature_sensors,
                current_sensors,
                thermostats,
                variables,
            }),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Raw command access for methods no controller wraps.
    pub fn client(&self) -> &CommandClient {
        &self.inner.client
    }

    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    // ── Typed controllers ────────────────────────────────────────────

    pub fn loads(&self) -> &Controller<Loads> {
        &self.inner.loads
    }

    pub fn load_groups(&self) -> &Controller<LoadGroups> {
        &self.inner.load_groups
    }

    pub fn rgb_loads(&self) -> &Controller<RgbLoads> {
        &self.inner.rgb_loads
    }

    pub fn blinds(&self) -> &Controller<Blinds> {
        &self.inner.blinds
    }

    pub fn blind_groups(&self) -> &Controller<BlindGroups> {
        &self.inner.blind_groups
    }

    pub fn temperature_sensors(&self) -> &Controller<TemperatureSensors> {
        &self.inner.temperature_sensors
    }

    pub fn current_sensors(&self) -> &Controller<CurrentSensors> {
        &self.inner.current_sensors
    }

    pub fn thermostats(&self) -> &Controller<Thermostats> {
        &self.inner.thermostats
    }

    pub fn variables(&self) -> &Controller<Variables> {
        &self.inner.variables
    }

    // ── Catalog & state ──────────────────────────────────────────────

    /// Replace the known objects with `entries`.
    pub fn load_catalog(
        &self,
        entries: impl IntoIterator<Item = ObjectInfo>,
    ) -> Result<CatalogSummary, CoreError> {
        self.inner.registry.load_catalog(entries)
    }

    /// Initialize every controller with the flags from the config.
    pub async fn initialize(&self) -> Result<(), CoreError> {
        let config = &self.inner.config;
        self.initialize_with(config.fetch_state, config.monitor_state)
            .await
    }

    pub async fn initialize_with(
        &self,
        fetch_state: bool,
        monitor_state: bool,
    ) -> Result<(), CoreError> {
        info!(
            objects = self.inner.registry.len(),
            fetch_state, monitor_state, "initializing controllers"
        );
        self.inner
            .registry
            .initialize(fetch_state, monitor_state)
            .await
    }

    pub fn get(&self, id: ObjectId) -> Option<Arc<SystemObject>> {
        self.inner.registry.get(id)
    }

    /// Every change on every controller.
    pub fn subscribe<F>(&self, callback: F) -> RegistrySubscription
    where
        F: Fn(&ObjectEvent) + Send + Sync + 'static,
    {
        self.inner.registry.subscribe(callback)
    }

    /// Event-connection state.
    pub fn connection_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.stream.connection_state()
    }

    /// Stop monitoring, stop the event stream (including any backoff wait),
    /// fail outstanding commands and release both connections.
    ///
    /// Idempotent, and safe before `initialize`.
    pub async fn close(&self) {
        self.inner.registry.shutdown().await;
        self.inner.stream.stop().await;
        self.inner.client.close().await;
        info!(host = %self.inner.config.host, "vantage client closed");
    }
}
