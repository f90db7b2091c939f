#![allow(clippy::unwrap_used)]
// Integration tests for `CommandClient` against an in-process mock controller.

mod common;

use std::time::Duration;

use futures_util::future::join_all;
use pretty_assertions::assert_eq;
use secrecy::SecretString;

use common::{accept, connector, expect_line, expect_silence, mock_controller};
use vantage_api::interfaces::ThermostatStatus;
use vantage_api::{CommandClient, Credentials, Error, FixedPoint, Value};

const TIMEOUT: Duration = Duration::from_secs(5);

// ── Correlation ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_concurrent_invokes_resolve_in_fifo_order() {
    let (listener, config) = mock_controller().await;
    let client = CommandClient::new(connector(config), TIMEOUT);

    let server = tokio::spawn(async move {
        let mut peer = accept(&listener).await;
        for id in 1..=5_u32 {
            let line = expect_line(&mut peer).await;
            assert_eq!(line, format!("INVOKE {id} Load.GetLevel"));
            // Only one request may be in flight.
            expect_silence(&mut peer, Duration::from_millis(30)).await;
            peer.send_line(&format!("R:INVOKE {id} {}.000 Load.GetLevel", id * 10))
                .await
                .unwrap();
        }
    });

    let calls = (1..=5_u32).map(|id| {
        let client = client.clone();
        async move { client.load().get_level(id).await }
    });
    let levels: Vec<FixedPoint> = join_all(calls)
        .await
        .into_iter()
        .map(Result::unwrap)
        .collect();

    assert_eq!(
        levels,
        (1..=5).map(|id| FixedPoint::from_int(id * 10)).collect::<Vec<_>>()
    );
    server.await.unwrap();
}

#[tokio::test]
async fn test_timeout_does_not_poison_connection() {
    let (listener, config) = mock_controller().await;
    let client = CommandClient::new(connector(config), Duration::from_millis(150));

    let server = tokio::spawn(async move {
        let mut peer = accept(&listener).await;
        assert_eq!(expect_line(&mut peer).await, "INVOKE 1 Load.GetLevel");
        // Never answer the first request in time.
        assert_eq!(expect_line(&mut peer).await, "INVOKE 2 Load.GetLevel");
        peer.send_line("R:INVOKE 1 11.000 Load.GetLevel").await.unwrap();
        peer.send_line("R:INVOKE 2 22.000 Load.GetLevel").await.unwrap();
    });

    let first = client.load().get_level(1).await;
    assert!(matches!(first, Err(Error::Timeout { .. })), "got {first:?}");

    let second = client.load().get_level(2).await.unwrap();
    assert_eq!(second, FixedPoint::from_int(22));
    server.await.unwrap();
}

#[tokio::test]
async fn test_error_reply_fails_only_that_caller() {
    let (listener, config) = mock_controller().await;
    let client = CommandClient::new(connector(config), TIMEOUT);

    let server = tokio::spawn(async move {
        let mut peer = accept(&listener).await;
        expect_line(&mut peer).await;
        peer.send_line("R:ERROR:7 Invalid object").await.unwrap();
        expect_line(&mut peer).await;
        peer.send_line("R:INVOKE 3 100.000 Load.GetLevel").await.unwrap();
    });

    let err = client.load().get_level(99).await.unwrap_err();
    assert_eq!(err.command_code(), Some(7));
    assert_eq!(client.load().get_level(3).await.unwrap(), FixedPoint::from_int(100));
    server.await.unwrap();
}

// ── Connection loss ─────────────────────────────────────────────────

#[tokio::test]
async fn test_connection_loss_fails_pending_then_reconnects_lazily() {
    let (listener, config) = mock_controller().await;
    let client = CommandClient::new(connector(config), TIMEOUT);

    let server = tokio::spawn(async move {
        let mut peer = accept(&listener).await;
        expect_line(&mut peer).await;
        // Give the other callers time to queue, then drop the socket.
        tokio::time::sleep(Duration::from_millis(50)).await;
        drop(peer);

        let mut peer = accept(&listener).await;
        assert_eq!(expect_line(&mut peer).await, "INVOKE 4 Load.GetLevel");
        peer.send_line("R:INVOKE 4 40.000 Load.GetLevel").await.unwrap();
    });

    let calls = (1..=3_u32).map(|id| {
        let client = client.clone();
        async move { client.load().get_level(id).await }
    });
    for result in join_all(calls).await {
        assert!(matches!(result, Err(Error::ConnectionLost)), "got {result:?}");
    }

    assert_eq!(client.load().get_level(4).await.unwrap(), FixedPoint::from_int(40));
    server.await.unwrap();
}

#[tokio::test]
async fn test_connect_failure_surfaces_then_next_request_retries() {
    let (listener, config) = mock_controller().await;
    let port = config.port;
    drop(listener);

    let client = CommandClient::new(connector(config), TIMEOUT);
    let err = client.load().get_level(1).await.unwrap_err();
    assert!(matches!(err, Error::Transport(_)), "got {err:?}");

    // Controller comes back on the same port.
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port.unwrap()))
        .await
        .unwrap();
    let server = tokio::spawn(async move {
        let mut peer = accept(&listener).await;
        expect_line(&mut peer).await;
        peer.send_line("R:INVOKE 1 5.000 Load.GetLevel").await.unwrap();
    });
    assert_eq!(client.load().get_level(1).await.unwrap(), FixedPoint::from_int(5));
    server.await.unwrap();
}

#[tokio::test]
async fn test_close_fails_queued_and_rejects_new_requests() {
    let (listener, config) = mock_controller().await;
    let client = CommandClient::new(connector(config), TIMEOUT);

    let server = tokio::spawn(async move {
        let mut peer = accept(&listener).await;
        expect_line(&mut peer).await;
        // Hold the request open until the client goes away.
        let _ = peer.read_line().await;
    });

    let pending = {
        let client = client.clone();
        tokio::spawn(async move { client.load().get_level(1).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    client.close().await;
    client.close().await;

    let result = pending.await.unwrap();
    assert!(matches!(result, Err(Error::ConnectionLost)), "got {result:?}");
    assert!(matches!(client.load().get_level(2).await, Err(Error::Closed)));
    server.await.unwrap();
}

// ── Login ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_login_failure_is_authentication_error() {
    let (listener, mut config) = mock_controller().await;
    config.credentials = Some(Credentials {
        username: "admin".into(),
        password: SecretString::from("wrong"),
    });
    let client = CommandClient::new(connector(config), TIMEOUT);

    let server = tokio::spawn(async move {
        let mut peer = accept(&listener).await;
        assert_eq!(expect_line(&mut peer).await, r#"LOGIN "admin" "wrong""#);
        peer.send_line("R:ERROR:21 Incorrect username or password")
            .await
            .unwrap();
    });

    let err = client.load().get_level(1).await.unwrap_err();
    assert!(matches!(err, Error::Authentication { .. }), "got {err:?}");
    server.await.unwrap();
}

#[tokio::test]
async fn test_login_precedes_first_request() {
    let (listener, mut config) = mock_controller().await;
    config.credentials = Some(Credentials {
        username: "admin".into(),
        password: SecretString::from("hunter2"),
    });
    let client = CommandClient::new(connector(config), TIMEOUT);

    let server = tokio::spawn(async move {
        let mut peer = accept(&listener).await;
        assert!(expect_line(&mut peer).await.starts_with("LOGIN "));
        peer.send_line("R:LOGIN \"admin\" \"hunter2\"").await.unwrap();
        assert_eq!(expect_line(&mut peer).await, "INVOKE 8 Blind.Open");
        peer.send_line("R:INVOKE 8 0 Blind.Open").await.unwrap();
    });

    client.blind().open(8).await.unwrap();
    server.await.unwrap();
}

// ── Object interfaces ───────────────────────────────────────────────

#[tokio::test]
async fn test_set_rgb_clamps_channels() {
    let (listener, config) = mock_controller().await;
    let client = CommandClient::new(connector(config), TIMEOUT);

    let server = tokio::spawn(async move {
        let mut peer = accept(&listener).await;
        let line = expect_line(&mut peer).await;
        peer.send_line("R:INVOKE 42 0 RGBLoad.SetRGB 255 0 128").await.unwrap();
        line
    });

    client.rgb_load().set_rgb(42, 300, -10, 128).await.unwrap();
    assert_eq!(server.await.unwrap(), "INVOKE 42 RGBLoad.SetRGB 255 0 128");
}

#[tokio::test]
async fn test_thermostat_status_decodes_symbolically() {
    let (listener, config) = mock_controller().await;
    let client = CommandClient::new(connector(config), TIMEOUT);

    let server = tokio::spawn(async move {
        let mut peer = accept(&listener).await;
        assert_eq!(expect_line(&mut peer).await, "INVOKE 7 Thermostat.GetStatus");
        peer.send_line("R:INVOKE 7 0 Thermostat.GetStatus Heating").await.unwrap();
    });

    let status = client.thermostat().get_status(7).await.unwrap();
    assert_eq!(status, ThermostatStatus::Heating);
    server.await.unwrap();
}

#[tokio::test]
async fn test_variable_get_and_set() {
    let (listener, config) = mock_controller().await;
    let client = CommandClient::new(connector(config), TIMEOUT);

    let server = tokio::spawn(async move {
        let mut peer = accept(&listener).await;
        assert_eq!(expect_line(&mut peer).await, "GETVARIABLE 12");
        peer.send_line("R:GETVARIABLE 12 \"porch light\"").await.unwrap();
        assert_eq!(expect_line(&mut peer).await, "VARIABLE 13 42");
        peer.send_line("R:VARIABLE 13 42").await.unwrap();
    });

    let value = client.variable().get(12).await.unwrap();
    assert_eq!(value, Value::Text("porch light".into()));
    client.variable().set(13, 42_i64).await.unwrap();
    server.await.unwrap();
}
