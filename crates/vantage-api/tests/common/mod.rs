// In-process mock controller shared by the integration suites.

#![allow(dead_code, clippy::unwrap_used)]

use std::time::Duration;

use tokio::net::TcpListener;

use vantage_api::{Connection, ConnectionConfig, Connector};

pub const STEP: Duration = Duration::from_secs(5);

/// Bind an ephemeral port and return a config pointing at it.
pub async fn mock_controller() -> (TcpListener, ConnectionConfig) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let mut config = ConnectionConfig::new("127.0.0.1");
    config.port = Some(listener.local_addr().unwrap().port());
    config.connect_timeout = Duration::from_secs(2);
    (listener, config)
}

pub fn connector(config: ConnectionConfig) -> Connector {
    Connector::new(config).unwrap()
}

/// Accept one client; the controller side speaks through a `Connection`
/// too, so reads survive timeouts.
pub async fn accept(listener: &TcpListener) -> Connection {
    let (stream, addr) = tokio::time::timeout(STEP, listener.accept())
        .await
        .expect("client never connected")
        .unwrap();
    Connection::from_io(stream, addr.to_string())
}

pub async fn expect_line(peer: &mut Connection) -> String {
    tokio::time::timeout(STEP, peer.read_line())
        .await
        .expect("no line from client")
        .unwrap()
        .expect("client closed the connection")
}

/// Assert nothing arrives within `window`.
pub async fn expect_silence(peer: &mut Connection, window: Duration) {
    if let Ok(line) = tokio::time::timeout(window, peer.read_line()).await {
        panic!("unexpected traffic: {line:?}");
    }
}
