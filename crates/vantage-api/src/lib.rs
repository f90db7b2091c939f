// vantage-api: Async Rust client for the Vantage host-command protocol (commands + event stream)

pub mod codec;
pub mod command;
pub mod connection;
pub mod error;
pub mod events;
pub mod interfaces;
pub mod subscription;
pub mod transport;

pub use codec::{DecodeError, FixedPoint, Value, WireType};
pub use command::{CommandClient, CommandResponse, InterfaceResponse};
pub use connection::{Connection, ConnectionConfig, Connector, Credentials};
pub use error::Error;
pub use events::{ConnectionState, Event, EventKind, EventStream, ReconnectConfig};
pub use subscription::{SubscriptionHandle, Subscribers};
pub use transport::TlsMode;
