// ── Typed controller kinds ──
//
// One zero-sized `ControllerKind` per object family. Each declares the
// catalog types and event categories it owns, how an event maps onto
// attributes, and which queries fetch an object's state.

mod blinds;
mod groups;
mod loads;
mod rgb_loads;
mod sensors;
mod thermostats;
mod variables;

pub use blinds::Blinds;
pub use groups::{BlindGroups, LOAD_TABLE, LoadGroups};
pub use loads::{LoadKind, Loads};
pub use rgb_loads::RgbLoads;
pub use sensors::{CurrentSensors, TemperatureSensors};
pub use thermostats::Thermostats;
pub use variables::Variables;

use vantage_api::codec::{self, WireType};
use vantage_api::{DecodeError, Event, Value};

use super::AttributeUpdate;

/// Attribute names shared by more than one kind.
pub mod attr {
    pub const LEVEL: &str = "level";
    pub const POSITION: &str = "position";
    pub const VALUE: &str = "value";
    pub const CURRENT: &str = "current";

    pub const RED: &str = "red";
    pub const GREEN: &str = "green";
    pub const BLUE: &str = "blue";
    pub const WHITE: &str = "white";
    pub const HUE: &str = "hue";
    pub const SATURATION: &str = "saturation";
    pub const LIGHTNESS: &str = "lightness";
    pub const COLOR: &str = "color";

    pub const INDOOR_TEMPERATURE: &str = "indoor_temperature";
    pub const OUTDOOR_TEMPERATURE: &str = "outdoor_temperature";
    pub const HEAT_SET_POINT: &str = "heat_set_point";
    pub const COOL_SET_POINT: &str = "cool_set_point";
    pub const AUTO_SET_POINT: &str = "auto_set_point";
    pub const OPERATION_MODE: &str = "operation_mode";
    pub const FAN_MODE: &str = "fan_mode";
    pub const DAY_MODE: &str = "day_mode";
    pub const HOLD_MODE: &str = "hold_mode";
    pub const STATUS: &str = "status";
}

/// Decode argument `index` as `T` and store it under `name`.
fn arg_update<T>(event: &Event, index: usize, name: &'static str) -> AttributeUpdate
where
    T: WireType,
    Value: From<T>,
{
    event.arg::<T>(index).map(|v| (name, Value::from(v)))
}

/// The result token of an enhanced-log line.
fn result_token(event: &Event) -> &str {
    event.result.as_deref().unwrap_or_default()
}

/// The value a getter reported: the first argument when present,
/// otherwise the result token.
fn reported_token(event: &Event) -> &str {
    event
        .args
        .first()
        .map_or_else(|| result_token(event), String::as_str)
}

/// Validate a by-name enumeration and keep its canonical name.
fn symbol<E: WireType>(token: &str) -> Result<Value, DecodeError> {
    codec::decode::<E>(token).map(|e| Value::Symbol(e.encode()))
}
