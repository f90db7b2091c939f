use vantage_api::{CommandClient, Event, FixedPoint, Value};

use super::arg_update;
use super::attr::POSITION;
use crate::controller::{AttributeUpdate, Controller, ControllerKind, FetchResult};
use crate::error::CoreError;
use crate::model::{ObjectId, SystemObject};

/// Shades and blinds of every supported driver.
#[derive(Debug, Default, Clone, Copy)]
pub struct Blinds;

impl ControllerKind for Blinds {
    const NAME: &'static str = "blinds";
    const OBJECT_TYPES: &'static [&'static str] = &[
        "QISBlind",
        "QubeBlind",
        "RelayBlind",
        "Somfy.RS-485_Shade_CHILD",
        "Somfy.URTSI_2_Shade_CHILD",
    ];
    const STATUS_CATEGORIES: &'static [&'static str] = &["BLIND"];

    fn decode_event(&self, event: &Event) -> Vec<AttributeUpdate> {
        // S:BLIND <id> <position>
        vec![arg_update::<FixedPoint>(event, 0, POSITION)]
    }

    fn fetch_state<'a>(
        &'a self,
        client: &'a CommandClient,
        object: &'a SystemObject,
    ) -> FetchResult<'a> {
        Box::pin(async move {
            let position = client.blind().get_position(object.id, false).await?;
            Ok(vec![(POSITION, Value::Fixed(position))])
        })
    }
}

impl Controller<Blinds> {
    pub async fn open(&self, id: ObjectId) -> Result<(), CoreError> {
        self.known(id)?;
        Ok(self.client().blind().open(id).await?)
    }

    pub async fn close(&self, id: ObjectId) -> Result<(), CoreError> {
        self.known(id)?;
        Ok(self.client().blind().close(id).await?)
    }

    pub async fn stop(&self, id: ObjectId) -> Result<(), CoreError> {
        self.known(id)?;
        Ok(self.client().blind().stop(id).await?)
    }

    pub async fn set_position(&self, id: ObjectId, position: FixedPoint) -> Result<(), CoreError> {
        self.known(id)?;
        Ok(self.client().blind().set_position(id, position).await?)
    }

    fn known(&self, id: ObjectId) -> Result<(), CoreError> {
        if self.contains(id) {
            Ok(())
        } else {
            Err(CoreError::ObjectNotFound { id })
        }
    }
}
