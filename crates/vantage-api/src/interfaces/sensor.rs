use crate::codec::FixedPoint;
use crate::command::CommandClient;
use crate::error::Error;

/// Read-only sensor queries.
pub struct SensorInterface<'a> {
    client: &'a CommandClient,
}

impl<'a> SensorInterface<'a> {
    pub fn new(client: &'a CommandClient) -> Self {
        Self { client }
    }

    /// `Temperature.GetValue`, degrees Celsius.
    pub async fn get_temperature(&self, id: u32) -> Result<FixedPoint, Error> {
        self.client
            .invoke(id, "Temperature.GetValue", &[])
            .await?
            .result_as()
    }

    /// `CurrentSensor.GetCurrent`, amps. `hw` bypasses the controller cache.
    pub async fn get_current(&self, id: u32, hw: bool) -> Result<FixedPoint, Error> {
        let method = if hw {
            "CurrentSensor.GetCurrentHW"
        } else {
            "CurrentSensor.GetCurrent"
        };
        self.client.invoke(id, method, &[]).await?.result_as()
    }
}
