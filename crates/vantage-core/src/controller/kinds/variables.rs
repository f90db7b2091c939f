use vantage_api::{CommandClient, Event, Value};

use super::arg_update;
use super::attr::VALUE;
use crate::controller::{AttributeUpdate, Controller, ControllerKind, FetchResult};
use crate::error::CoreError;
use crate::model::{ObjectId, SystemObject};

/// Scalar variables (`GMem`). The value type is inferred from the wire.
#[derive(Debug, Default, Clone, Copy)]
pub struct Variables;

impl ControllerKind for Variables {
    const NAME: &'static str = "variables";
    const OBJECT_TYPES: &'static [&'static str] = &["GMem"];
    const STATUS_CATEGORIES: &'static [&'static str] = &["VARIABLE"];

    fn decode_event(&self, event: &Event) -> Vec<AttributeUpdate> {
        // S:VARIABLE <id> <value>
        vec![arg_update::<Value>(event, 0, VALUE)]
    }

    fn fetch_state<'a>(
        &'a self,
        client: &'a CommandClient,
        object: &'a SystemObject,
    ) -> FetchResult<'a> {
        Box::pin(async move {
            let value = client.variable().get(object.id).await?;
            Ok(vec![(VALUE, value)])
        })
    }
}

impl Controller<Variables> {
    /// Write a variable. The cache follows from the `S:VARIABLE` echo.
    pub async fn set(&self, id: ObjectId, value: impl Into<Value>) -> Result<(), CoreError> {
        if !self.contains(id) {
            return Err(CoreError::ObjectNotFound { id });
        }
        self.client().variable().set(id, value).await?;
        Ok(())
    }
}
