// ── Object interfaces ──
//
// Thin typed wrappers over `CommandClient::invoke`. Each method only
// assembles the `Interface.Method` name and encoded arguments, then
// decodes the reply through the codec. No state is kept here.

mod blind;
mod load;
mod rgb_load;
mod sensor;
mod thermostat;
mod variable;

pub use blind::BlindInterface;
pub use load::{LoadInterface, RampType};
pub use rgb_load::{HslAttribute, RgbChannel, RgbLoadInterface};
pub use sensor::SensorInterface;
pub use thermostat::{DayMode, FanMode, HoldMode, OperationMode, ThermostatInterface, ThermostatStatus};
pub use variable::{GMemBuffer, VariableInterface};

use crate::codec::{self, WireType};
use crate::command::{CommandClient, InterfaceResponse};
use crate::error::Error;

impl CommandClient {
    pub fn load(&self) -> LoadInterface<'_> {
        LoadInterface::new(self)
    }

    pub fn rgb_load(&self) -> RgbLoadInterface<'_> {
        RgbLoadInterface::new(self)
    }

    pub fn blind(&self) -> BlindInterface<'_> {
        BlindInterface::new(self)
    }

    pub fn thermostat(&self) -> ThermostatInterface<'_> {
        ThermostatInterface::new(self)
    }

    pub fn sensor(&self) -> SensorInterface<'_> {
        SensorInterface::new(self)
    }

    pub fn variable(&self) -> VariableInterface<'_> {
        VariableInterface::new(self)
    }
}

/// Value of a getter reply: the first argument after the method name
/// when present, otherwise the result token.
pub(crate) fn reply_value<T: WireType>(response: &InterfaceResponse) -> Result<T, Error> {
    match response.args.first() {
        Some(token) => Ok(codec::decode(token)?),
        None => response.result_as(),
    }
}
