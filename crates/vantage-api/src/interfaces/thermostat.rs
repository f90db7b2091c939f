use strum::{Display, EnumString, IntoStaticStr};

use super::reply_value;
use crate::codec::FixedPoint;
use crate::command::CommandClient;
use crate::error::Error;
use crate::{wire_args, wire_enum};

// ── Symbolic modes ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr)]
pub enum OperationMode {
    Off,
    Cool,
    Heat,
    Auto,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr)]
pub enum FanMode {
    Off,
    On,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr)]
pub enum DayMode {
    Day,
    Night,
    Unknown,
    Standby,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr)]
pub enum HoldMode {
    Normal,
    Hold,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr)]
pub enum ThermostatStatus {
    Off,
    Cooling,
    Heating,
    Offline,
}

wire_enum!(OperationMode, FanMode, DayMode, HoldMode, ThermostatStatus);

/// `Thermostat.*` methods. Temperatures are degrees Celsius.
pub struct ThermostatInterface<'a> {
    client: &'a CommandClient,
}

impl<'a> ThermostatInterface<'a> {
    pub fn new(client: &'a CommandClient) -> Self {
        Self { client }
    }

    async fn get<T: crate::codec::WireType>(&self, id: u32, method: &str) -> Result<T, Error> {
        let response = self.client.invoke(id, method, &[]).await?;
        reply_value(&response)
    }

    async fn set(&self, id: u32, method: &str, args: &[String]) -> Result<(), Error> {
        self.client.invoke(id, method, args).await?;
        Ok(())
    }

    pub async fn get_indoor_temperature(&self, id: u32) -> Result<FixedPoint, Error> {
        self.get(id, "Thermostat.GetIndoorTemperature").await
    }

    pub async fn get_outdoor_temperature(&self, id: u32) -> Result<FixedPoint, Error> {
        self.get(id, "Thermostat.GetOutdoorTemperature").await
    }

    pub async fn get_heat_set_point(&self, id: u32) -> Result<FixedPoint, Error> {
        self.get(id, "Thermostat.GetHeatSetPoint").await
    }

    pub async fn set_heat_set_point(&self, id: u32, temp: FixedPoint) -> Result<(), Error> {
        self.set(id, "Thermostat.SetHeatSetPoint", &wire_args![temp]).await
    }

    pub async fn get_cool_set_point(&self, id: u32) -> Result<FixedPoint, Error> {
        self.get(id, "Thermostat.GetCoolSetPoint").await
    }

    pub async fn set_cool_set_point(&self, id: u32, temp: FixedPoint) -> Result<(), Error> {
        self.set(id, "Thermostat.SetCoolSetPoint", &wire_args![temp]).await
    }

    pub async fn get_auto_set_point(&self, id: u32) -> Result<FixedPoint, Error> {
        self.get(id, "Thermostat.GetAutoSetPoint").await
    }

    pub async fn set_auto_set_point(&self, id: u32, temp: FixedPoint) -> Result<(), Error> {
        self.set(id, "Thermostat.SetAutoSetPoint", &wire_args![temp]).await
    }

    pub async fn get_operation_mode(&self, id: u32) -> Result<OperationMode, Error> {
        self.get(id, "Thermostat.GetOperationMode").await
    }

    pub async fn set_operation_mode(&self, id: u32, mode: OperationMode) -> Result<(), Error> {
        self.set(id, "Thermostat.SetOperationMode", &wire_args![mode]).await
    }

    pub async fn get_fan_mode(&self, id: u32) -> Result<FanMode, Error> {
        self.get(id, "Thermostat.GetFanMode").await
    }

    pub async fn set_fan_mode(&self, id: u32, mode: FanMode) -> Result<(), Error> {
        self.set(id, "Thermostat.SetFanMode", &wire_args![mode]).await
    }

    pub async fn get_day_mode(&self, id: u32) -> Result<DayMode, Error> {
        self.get(id, "Thermostat.GetDayMode").await
    }

    pub async fn set_day_mode(&self, id: u32, mode: DayMode) -> Result<(), Error> {
        self.set(id, "Thermostat.SetDayMode", &wire_args![mode]).await
    }

    pub async fn get_hold_mode(&self, id: u32) -> Result<HoldMode, Error> {
        self.get(id, "Thermostat.GetHoldMode").await
    }

    pub async fn set_hold_mode(&self, id: u32, mode: HoldMode) -> Result<(), Error> {
        self.set(id, "Thermostat.SetHoldMode", &wire_args![mode]).await
    }

    pub async fn get_status(&self, id: u32) -> Result<ThermostatStatus, Error> {
        self.get(id, "Thermostat.GetStatus").await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::codec::{decode, encode};

    #[test]
    fn modes_travel_by_name() {
        assert_eq!(decode::<ThermostatStatus>("Heating").unwrap(), ThermostatStatus::Heating);
        assert_eq!(encode(&OperationMode::Auto), "Auto");
        assert_eq!(decode::<DayMode>("Standby").unwrap(), DayMode::Standby);
        assert!(decode::<FanMode>("2").is_err());
    }
}
