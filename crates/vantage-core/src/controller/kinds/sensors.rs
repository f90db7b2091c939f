use vantage_api::{CommandClient, Event, FixedPoint, Value};

use super::arg_update;
use super::attr::{CURRENT, VALUE};
use crate::controller::{AttributeUpdate, ControllerKind, FetchResult};
use crate::model::SystemObject;

/// Temperature probes, degrees Celsius in `value`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TemperatureSensors;

impl ControllerKind for TemperatureSensors {
    const NAME: &'static str = "temperature_sensors";
    const OBJECT_TYPES: &'static [&'static str] = &["Temperature"];
    const STATUS_CATEGORIES: &'static [&'static str] = &["TEMP"];

    fn decode_event(&self, event: &Event) -> Vec<AttributeUpdate> {
        // S:TEMP <id> <temp>
        vec![arg_update::<FixedPoint>(event, 0, VALUE)]
    }

    fn fetch_state<'a>(
        &'a self,
        client: &'a CommandClient,
        object: &'a SystemObject,
    ) -> FetchResult<'a> {
        Box::pin(async move {
            let value = client.sensor().get_temperature(object.id).await?;
            Ok(vec![(VALUE, Value::Fixed(value))])
        })
    }
}

/// Current sensors, amps in `current`.
#[derive(Debug, Default, Clone, Copy)]
pub struct CurrentSensors;

impl ControllerKind for CurrentSensors {
    const NAME: &'static str = "current_sensors";
    const OBJECT_TYPES: &'static [&'static str] = &["CurrentSensor"];
    const STATUS_CATEGORIES: &'static [&'static str] = &["CURRENT"];

    fn decode_event(&self, event: &Event) -> Vec<AttributeUpdate> {
        // S:CURRENT <id> <current>
        vec![arg_update::<FixedPoint>(event, 0, CURRENT)]
    }

    fn fetch_state<'a>(
        &'a self,
        client: &'a CommandClient,
        object: &'a SystemObject,
    ) -> FetchResult<'a> {
        Box::pin(async move {
            let current = client.sensor().get_current(object.id, false).await?;
            Ok(vec![(CURRENT, Value::Fixed(current))])
        })
    }
}
