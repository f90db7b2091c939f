#![allow(clippy::unwrap_used)]
// Integration tests for `EventStream` against an in-process mock controller.

mod common;

use std::time::Duration;

use pretty_assertions::assert_eq;
use tokio::sync::{broadcast, mpsc};

use common::{STEP, accept, connector, expect_line, mock_controller};
use vantage_api::{Connection, ConnectionState, Event, EventKind, EventStream, ReconnectConfig};

fn quick_reconnect() -> ReconnectConfig {
    ReconnectConfig {
        initial_delay: Duration::from_millis(20),
        max_delay: Duration::from_millis(100),
        max_retries: None,
    }
}

fn collect_events(stream: &EventStream) -> mpsc::UnboundedReceiver<Event> {
    let (tx, rx) = mpsc::unbounded_channel();
    let _handle = stream.subscribe(|_| true, move |event| {
        let _ = tx.send(event.clone());
    });
    rx
}

async fn next_event(rx: &mut mpsc::UnboundedReceiver<Event>) -> Event {
    tokio::time::timeout(STEP, rx.recv()).await.unwrap().unwrap()
}

// ── Handshake and dispatch ──────────────────────────────────────────

#[tokio::test]
async fn test_handshake_and_ordered_dispatch() {
    let (listener, config) = mock_controller().await;
    let stream = EventStream::new(connector(config), quick_reconnect());
    stream.enable_status("load");
    stream.enable_status("TEMP");
    stream.enable_enhanced_log("STATUS");
    let mut events = collect_events(&stream);

    stream.start().await;
    let mut peer = accept(&listener).await;

    let mut handshake = Vec::new();
    for _ in 0..4 {
        handshake.push(expect_line(&mut peer).await);
    }
    assert_eq!(
        handshake,
        vec!["STATUS LOAD", "STATUS TEMP", "ELENABLE 1", "ELLOG STATUS ON"]
    );

    peer.send_line("R:STATUS LOAD").await.unwrap();
    peer.send_line("S:LOAD 12 75.000").await.unwrap();
    peer.send_line("garbage that is not an event").await.unwrap();
    peer.send_line("EL: 42 RGBLoad.SetRGB 0 255 0 128").await.unwrap();
    peer.send_line("S:TEMP 10 21.5").await.unwrap();

    let first = next_event(&mut events).await;
    assert_eq!((first.kind, first.id, first.category.as_str()), (EventKind::Status, 12, "LOAD"));

    let second = next_event(&mut events).await;
    assert_eq!(second.kind, EventKind::EnhancedLog);
    assert_eq!(second.category, "RGBLoad");
    assert_eq!(second.method.as_deref(), Some("SetRGB"));

    let third = next_event(&mut events).await;
    assert_eq!(third.args, vec!["21.5"]);

    stream.stop().await;
}

#[tokio::test]
async fn test_late_subscription_is_sent_on_live_connection() {
    let (listener, config) = mock_controller().await;
    let stream = EventStream::new(connector(config), quick_reconnect());
    stream.enable_status("LOAD");
    stream.start().await;

    let mut peer = accept(&listener).await;
    assert_eq!(expect_line(&mut peer).await, "STATUS LOAD");

    // Wait for the stream to report the session before adding more.
    let mut state = stream.connection_state();
    tokio::time::timeout(STEP, state.wait_for(|s| *s == ConnectionState::Connected))
        .await
        .unwrap()
        .unwrap();

    stream.enable_status("BLIND");
    stream.enable_status("LOAD");
    assert_eq!(expect_line(&mut peer).await, "STATUS BLIND");

    stream.stop().await;
}

#[tokio::test]
async fn test_panicking_subscriber_does_not_stop_delivery() {
    let (listener, config) = mock_controller().await;
    let stream = EventStream::new(connector(config), quick_reconnect());
    stream.enable_status("LOAD");
    let _bad = stream.subscribe(|_| true, |_| panic!("subscriber bug"));
    let mut events = collect_events(&stream);

    stream.start().await;
    let mut peer = accept(&listener).await;
    expect_line(&mut peer).await;

    peer.send_line("S:LOAD 1 10.000").await.unwrap();
    peer.send_line("S:LOAD 2 20.000").await.unwrap();

    assert_eq!(next_event(&mut events).await.id, 1);
    assert_eq!(next_event(&mut events).await.id, 2);
    stream.stop().await;
}

// ── Reconnect ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_resync_fires_once_per_outage_without_replay() {
    let (listener, config) = mock_controller().await;
    let stream = EventStream::new(connector(config), quick_reconnect());
    stream.enable_status("LOAD");
    let mut resyncs = stream.resyncs();
    let mut events = collect_events(&stream);

    stream.start().await;

    let mut peer = accept(&listener).await;
    assert_eq!(expect_line(&mut peer).await, "STATUS LOAD");
    peer.send_line("S:LOAD 1 50.000").await.unwrap();
    assert_eq!(next_event(&mut events).await.args, vec!["50.000"]);

    // No resync for the initial connection.
    assert!(matches!(resyncs.try_recv(), Err(broadcast::error::TryRecvError::Empty)));

    drop(peer);

    let mut peer = accept(&listener).await;
    assert_eq!(expect_line(&mut peer).await, "STATUS LOAD");
    peer.send_line("S:LOAD 1 60.000").await.unwrap();
    assert_eq!(next_event(&mut events).await.args, vec!["60.000"]);

    assert_eq!(tokio::time::timeout(STEP, resyncs.recv()).await.unwrap().unwrap(), 1);
    assert!(matches!(resyncs.try_recv(), Err(broadcast::error::TryRecvError::Empty)));
    assert!(events.try_recv().is_err(), "no event may be redelivered");

    stream.stop().await;
}

#[tokio::test]
async fn test_sessions_dropped_after_handshake_back_off() {
    let (listener, config) = mock_controller().await;
    let stream = EventStream::new(
        connector(config),
        ReconnectConfig {
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(1),
            max_retries: None,
        },
    );
    stream.enable_status("LOAD");
    let mut resyncs = stream.resyncs();
    stream.start().await;

    // The controller reads the handshake and hangs up, every time.
    let window = tokio::time::sleep(Duration::from_millis(500));
    tokio::pin!(window);
    let mut sessions = 0_u64;
    loop {
        tokio::select! {
            () = &mut window => break,
            accepted = listener.accept() => {
                let (socket, addr) = accepted.unwrap();
                let mut peer = Connection::from_io(socket, addr.to_string());
                assert_eq!(expect_line(&mut peer).await, "STATUS LOAD");
                sessions += 1;
            }
        }
    }
    stream.stop().await;

    assert!((1..=3).contains(&sessions), "{sessions} sessions in 500ms");
    let mut generations = Vec::new();
    while let Ok(generation) = resyncs.try_recv() {
        generations.push(generation);
    }
    // One resync per reconnect, never a burst.
    let resynced = u64::try_from(generations.len()).unwrap();
    assert!(resynced <= sessions, "{resynced} resyncs for {sessions} sessions");
    assert_eq!(generations, (1..=resynced).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_stop_cancels_backoff_wait() {
    let (listener, config) = mock_controller().await;
    drop(listener);

    let stream = EventStream::new(
        connector(config),
        ReconnectConfig {
            initial_delay: Duration::from_secs(60),
            max_delay: Duration::from_secs(60),
            max_retries: None,
        },
    );
    let mut state = stream.connection_state();
    stream.start().await;
    stream.start().await;

    tokio::time::timeout(
        STEP,
        state.wait_for(|s| matches!(s, ConnectionState::Reconnecting { .. })),
    )
    .await
    .unwrap()
    .unwrap();

    tokio::time::timeout(Duration::from_secs(2), stream.stop())
        .await
        .expect("stop must not wait out the backoff");
    assert_eq!(*stream.connection_state().borrow(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn test_retry_cap_marks_stream_failed() {
    let (listener, config) = mock_controller().await;
    drop(listener);

    let stream = EventStream::new(
        connector(config),
        ReconnectConfig {
            initial_delay: Duration::from_millis(5),
            max_delay: Duration::from_millis(10),
            max_retries: Some(2),
        },
    );
    let mut state = stream.connection_state();
    stream.start().await;

    tokio::time::timeout(STEP, state.wait_for(|s| *s == ConnectionState::Failed))
        .await
        .unwrap()
        .unwrap();
    stream.stop().await;
}
