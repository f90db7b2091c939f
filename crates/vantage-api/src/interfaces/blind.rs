use crate::codec::FixedPoint;
use crate::command::CommandClient;
use crate::error::Error;
use crate::wire_args;

/// `Blind.*` methods. Positions are percentages, tilt is -100..=100.
pub struct BlindInterface<'a> {
    client: &'a CommandClient,
}

impl<'a> BlindInterface<'a> {
    pub fn new(client: &'a CommandClient) -> Self {
        Self { client }
    }

    pub async fn open(&self, id: u32) -> Result<(), Error> {
        self.run(id, "Blind.Open").await
    }

    pub async fn close(&self, id: u32) -> Result<(), Error> {
        self.run(id, "Blind.Close").await
    }

    pub async fn stop(&self, id: u32) -> Result<(), Error> {
        self.run(id, "Blind.Stop").await
    }

    async fn run(&self, id: u32, method: &str) -> Result<(), Error> {
        self.client.invoke(id, method, &[]).await?.check()?;
        Ok(())
    }

    pub async fn set_position(&self, id: u32, position: FixedPoint) -> Result<(), Error> {
        let position = position.clamp_to(FixedPoint::ZERO, FixedPoint::from_int(100));
        self.client
            .invoke(id, "Blind.SetPosition", &wire_args![position])
            .await?
            .check()?;
        Ok(())
    }

    /// Position from the controller's cache, or the hardware when `hw`.
    pub async fn get_position(&self, id: u32, hw: bool) -> Result<FixedPoint, Error> {
        let method = if hw {
            "Blind.GetPositionHW"
        } else {
            "Blind.GetPosition"
        };
        self.client.invoke(id, method, &[]).await?.result_as()
    }

    pub async fn set_tilt_angle(&self, id: u32, angle: i32) -> Result<(), Error> {
        self.client
            .invoke(id, "Blind.SetTiltAngle", &wire_args![angle.clamp(-100, 100)])
            .await?
            .check()?;
        Ok(())
    }

    pub async fn get_tilt_angle(&self, id: u32) -> Result<i32, Error> {
        self.client
            .invoke(id, "Blind.GetTiltAngle", &[])
            .await?
            .result_as()
    }

    pub async fn is_tilt_available(&self, id: u32) -> Result<bool, Error> {
        self.client
            .invoke(id, "Blind.IsTiltAvailable", &[])
            .await?
            .result_as()
    }
}
