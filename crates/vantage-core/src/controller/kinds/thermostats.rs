use vantage_api::codec::WireType;
use vantage_api::interfaces::{DayMode, FanMode, HoldMode, OperationMode, ThermostatStatus};
use vantage_api::{CommandClient, Event, FixedPoint, Value};

use super::attr::{
    AUTO_SET_POINT, COOL_SET_POINT, DAY_MODE, FAN_MODE, HEAT_SET_POINT, HOLD_MODE,
    INDOOR_TEMPERATURE, OPERATION_MODE, OUTDOOR_TEMPERATURE, STATUS,
};
use super::{reported_token, symbol};
use crate::controller::{AttributeUpdate, ControllerKind, FetchResult};
use crate::model::SystemObject;

/// Thermostats, kept current from `Thermostat.*` enhanced-log lines.
/// Modes are stored as their symbolic names.
#[derive(Debug, Default, Clone, Copy)]
pub struct Thermostats;

impl ControllerKind for Thermostats {
    const NAME: &'static str = "thermostats";
    const OBJECT_TYPES: &'static [&'static str] = &["Thermostat"];
    const LOG_INTERFACES: &'static [&'static str] = &["Thermostat"];

    fn decode_event(&self, event: &Event) -> Vec<AttributeUpdate> {
        let Some(method) = event.method.as_deref() else {
            return Vec::new();
        };
        // Getters report in the result, setters echo their argument.
        let Some(property) = method
            .strip_prefix("Get")
            .or_else(|| method.strip_prefix("Set"))
        else {
            return Vec::new();
        };

        let token = reported_token(event);
        let update = match property {
            "IndoorTemperature" => fixed(token).map(|v| (INDOOR_TEMPERATURE, v)),
            "OutdoorTemperature" => fixed(token).map(|v| (OUTDOOR_TEMPERATURE, v)),
            "HeatSetPoint" => fixed(token).map(|v| (HEAT_SET_POINT, v)),
            "CoolSetPoint" => fixed(token).map(|v| (COOL_SET_POINT, v)),
            "AutoSetPoint" => fixed(token).map(|v| (AUTO_SET_POINT, v)),
            "OperationMode" => symbol::<OperationMode>(token).map(|v| (OPERATION_MODE, v)),
            "FanMode" => symbol::<FanMode>(token).map(|v| (FAN_MODE, v)),
            "DayMode" => symbol::<DayMode>(token).map(|v| (DAY_MODE, v)),
            "HoldMode" => symbol::<HoldMode>(token).map(|v| (HOLD_MODE, v)),
            "Status" => symbol::<ThermostatStatus>(token).map(|v| (STATUS, v)),
            _ => return Vec::new(),
        };
        vec![update]
    }

    fn fetch_state<'a>(
        &'a self,
        client: &'a CommandClient,
        object: &'a SystemObject,
    ) -> FetchResult<'a> {
        Box::pin(async move {
            let t = client.thermostat();
            let id = object.id;
            Ok(vec![
                (INDOOR_TEMPERATURE, Value::Fixed(t.get_indoor_temperature(id).await?)),
                (OUTDOOR_TEMPERATURE, Value::Fixed(t.get_outdoor_temperature(id).await?)),
                (HEAT_SET_POINT, Value::Fixed(t.get_heat_set_point(id).await?)),
                (COOL_SET_POINT, Value::Fixed(t.get_cool_set_point(id).await?)),
                (AUTO_SET_POINT, Value::Fixed(t.get_auto_set_point(id).await?)),
                (OPERATION_MODE, Value::Symbol(t.get_operation_mode(id).await?.encode())),
                (FAN_MODE, Value::Symbol(t.get_fan_mode(id).await?.encode())),
                (DAY_MODE, Value::Symbol(t.get_day_mode(id).await?.encode())),
                (HOLD_MODE, Value::Symbol(t.get_hold_mode(id).await?.encode())),
                (STATUS, Value::Symbol(t.get_status(id).await?.encode())),
            ])
        })
    }
}

fn fixed(token: &str) -> Result<Value, vantage_api::DecodeError> {
    FixedPoint::decode(token).map(Value::Fixed)
}
