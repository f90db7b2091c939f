use bytes::Bytes;

use crate::codec::Value;
use crate::command::CommandClient;
use crate::error::Error;
use crate::wire_args;

/// Raw contents of a variable as returned by `GMem.Fetch`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GMemBuffer {
    pub data: Bytes,
    pub size: u32,
}

/// Variable (GMem) access. Values go through `GETVARIABLE`/`VARIABLE`,
/// which are far simpler than the raw buffer methods.
pub struct VariableInterface<'a> {
    client: &'a CommandClient,
}

impl<'a> VariableInterface<'a> {
    pub fn new(client: &'a CommandClient) -> Self {
        Self { client }
    }

    pub async fn get(&self, id: u32) -> Result<Value, Error> {
        self.client.get_variable(id).await
    }

    pub async fn set(&self, id: u32, value: impl Into<Value>) -> Result<(), Error> {
        self.client.set_variable(id, &value.into()).await
    }

    /// `GMem.Fetch` → `R:INVOKE <id> <rcode> GMem.Fetch <buffer> <size>`.
    pub async fn fetch(&self, id: u32) -> Result<GMemBuffer, Error> {
        let response = self.client.invoke(id, "GMem.Fetch", &[]).await?.check()?;
        Ok(GMemBuffer {
            data: response.arg(0)?,
            size: response.arg(1)?,
        })
    }

    /// `GMem.Commit <buffer> <size>`.
    pub async fn commit(&self, id: u32, data: Bytes) -> Result<(), Error> {
        let size = u32::try_from(data.len())
            .map_err(|_| Error::Protocol(format!("buffer of {} bytes too large", data.len())))?;
        self.client
            .invoke(id, "GMem.Commit", &wire_args![data, size])
            .await?
            .check()?;
        Ok(())
    }
}
