use strum::{EnumString, IntoStaticStr};

use crate::codec::FixedPoint;
use crate::command::CommandClient;
use crate::error::Error;
use crate::wire_args;

/// How `Load.Ramp` moves towards its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, IntoStaticStr)]
pub enum RampType {
    Opposite,
    Stop,
    Up,
    Down,
    Fixed,
    Variable,
    Adjust,
}

crate::wire_enum!(RampType);

/// `Load.*` methods.
pub struct LoadInterface<'a> {
    client: &'a CommandClient,
}

impl<'a> LoadInterface<'a> {
    pub fn new(client: &'a CommandClient) -> Self {
        Self { client }
    }

    /// Set the level, clamped to 0-100 percent.
    pub async fn set_level(&self, id: u32, level: FixedPoint) -> Result<(), Error> {
        let level = clamp_percent(level);
        self.client
            .invoke(id, "Load.SetLevel", &wire_args![level])
            .await?
            .check()?;
        Ok(())
    }

    pub async fn get_level(&self, id: u32) -> Result<FixedPoint, Error> {
        self.client
            .invoke(id, "Load.GetLevel", &[])
            .await?
            .result_as()
    }

    /// Ramp to `level` over `seconds`.
    pub async fn ramp(
        &self,
        id: u32,
        ramp: RampType,
        seconds: FixedPoint,
        level: FixedPoint,
    ) -> Result<(), Error> {
        let level = clamp_percent(level);
        self.client
            .invoke(id, "Load.Ramp", &wire_args![ramp, seconds, level])
            .await?
            .check()?;
        Ok(())
    }

    pub async fn turn_on(&self, id: u32) -> Result<(), Error> {
        self.set_level(id, FixedPoint::from_int(100)).await
    }

    pub async fn turn_off(&self, id: u32) -> Result<(), Error> {
        self.set_level(id, FixedPoint::ZERO).await
    }
}

fn clamp_percent(level: FixedPoint) -> FixedPoint {
    level.clamp_to(FixedPoint::ZERO, FixedPoint::from_int(100))
}
