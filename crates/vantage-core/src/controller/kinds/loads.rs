use vantage_api::{CommandClient, Event, FixedPoint, Value};

use super::arg_update;
use super::attr::LEVEL;
use crate::controller::{AttributeUpdate, Controller, ControllerKind, FetchResult};
use crate::error::CoreError;
use crate::model::{ObjectId, SystemObject};
use crate::query::QueryView;

/// Dimmers, relays and motors.
#[derive(Debug, Default, Clone, Copy)]
pub struct Loads;

impl ControllerKind for Loads {
    const NAME: &'static str = "loads";
    const OBJECT_TYPES: &'static [&'static str] = &["Load"];
    const STATUS_CATEGORIES: &'static [&'static str] = &["LOAD"];

    fn decode_event(&self, event: &Event) -> Vec<AttributeUpdate> {
        // S:LOAD <id> <level>
        vec![arg_update::<FixedPoint>(event, 0, LEVEL)]
    }

    fn fetch_state<'a>(
        &'a self,
        client: &'a CommandClient,
        object: &'a SystemObject,
    ) -> FetchResult<'a> {
        Box::pin(async move {
            let level = client.load().get_level(object.id).await?;
            Ok(vec![(LEVEL, Value::Fixed(level))])
        })
    }
}

/// How a load is wired, from the catalog's `load_type` property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadKind {
    Light,
    Relay,
    Motor,
}

impl LoadKind {
    pub fn of(object: &SystemObject) -> Self {
        match object.property("load_type") {
            Some("High Voltage Relay" | "Low Voltage Relay") => Self::Relay,
            Some("Motor") => Self::Motor,
            _ => Self::Light,
        }
    }
}

fn is_on(object: &SystemObject) -> bool {
    object.fixed(LEVEL).is_some_and(|level| level > FixedPoint::ZERO)
}

impl Controller<Loads> {
    /// Loads with a known level above zero.
    pub fn on(&self) -> QueryView {
        self.filter(is_on)
    }

    pub fn off(&self) -> QueryView {
        self.filter(|o| !is_on(o))
    }

    pub fn relays(&self) -> QueryView {
        self.filter(|o| LoadKind::of(o) == LoadKind::Relay)
    }

    pub fn motors(&self) -> QueryView {
        self.filter(|o| LoadKind::of(o) == LoadKind::Motor)
    }

    pub fn lights(&self) -> QueryView {
        self.filter(|o| LoadKind::of(o) == LoadKind::Light)
    }

    /// Set the level (0-100) of a known load.
    pub async fn set_level(&self, id: ObjectId, level: FixedPoint) -> Result<(), CoreError> {
        if !self.contains(id) {
            return Err(CoreError::ObjectNotFound { id });
        }
        self.client().load().set_level(id, level).await?;
        Ok(())
    }

    pub async fn turn_on(&self, id: ObjectId) -> Result<(), CoreError> {
        self.set_level(id, FixedPoint::from_int(100)).await
    }

    pub async fn turn_off(&self, id: ObjectId) -> Result<(), CoreError> {
        self.set_level(id, FixedPoint::ZERO).await
    }
}
