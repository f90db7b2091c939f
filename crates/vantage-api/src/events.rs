//! Push-event stream with auto-reconnect.
//!
//! Holds a dedicated connection to the controller, subscribes to status
//! categories and enhanced-log types, parses every unsolicited line into an
//! [`Event`] and dispatches it synchronously to subscribers in arrival
//! order. Reconnects with exponential backoff + jitter, re-issues the
//! subscription handshake and emits a resync signal once per outage.
//!
//! # Example
//!
//! ```rust,ignore
//! use vantage_api::connection::{ConnectionConfig, Connector};
//! use vantage_api::events::{EventStream, ReconnectConfig};
//!
//! let connector = Connector::new(ConnectionConfig::new("192.168.1.20"))?;
//! let stream = EventStream::new(connector, ReconnectConfig::default());
//! stream.enable_status("LOAD");
//!
//! let _handle = stream.subscribe(|e| e.category == "LOAD", |e| {
//!     println!("load {} -> {:?}", e.id, e.args);
//! });
//! stream.start().await;
//! ```

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::codec::{self, DecodeError, WireType, tokenize};
use crate::connection::{Connection, Connector};
use crate::error::Error;
use crate::subscription::{SubscriptionHandle, Subscribers};

const RESYNC_CHANNEL_CAPACITY: usize = 16;

/// A session that stays up this long counts as recovered even if it
/// carried no events.
const STABLE_SESSION: Duration = Duration::from_secs(30);

// ── Event ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// `S:<CATEGORY> <id> [args...]`
    Status,
    /// `EL: <id> <Interface.Method> <result> [args...]`
    EnhancedLog,
}

/// One decoded push line. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub kind: EventKind,
    pub id: u32,
    /// Status tag (`LOAD`, `TEMP`, ...) or, for enhanced-log events, the
    /// interface name of the logged method (`Load`, `RGBLoad`, ...).
    pub category: String,
    /// Method name without the interface prefix (enhanced log only).
    pub method: Option<String>,
    /// Result token of the logged call (enhanced log only).
    pub result: Option<String>,
    pub args: Vec<String>,
}

impl Event {
    pub fn arg<T: WireType>(&self, index: usize) -> Result<T, DecodeError> {
        let token = self
            .args
            .get(index)
            .ok_or_else(|| DecodeError::new("", T::TYPE_NAME))?;
        codec::decode(token)
    }

    /// `Interface.Method` for enhanced-log events.
    pub fn qualified_method(&self) -> Option<String> {
        self.method
            .as_ref()
            .map(|m| format!("{}.{m}", self.category))
    }
}

/// Parse one line from the event connection.
///
/// `Ok(None)` for `R:` acknowledgements, which carry no event.
pub fn parse_line(line: &str) -> Result<Option<Event>, Error> {
    let tokens = tokenize(line);
    let Some((&head, rest)) = tokens.split_first() else {
        return Err(Error::Protocol("empty line".into()));
    };

    let parse_id = |token: Option<&&str>| -> Result<u32, Error> {
        token
            .and_then(|t| t.parse().ok())
            .ok_or_else(|| Error::Protocol(format!("missing or bad object id: {line}")))
    };
    let owned = |tokens: &[&str]| -> Vec<String> { tokens.iter().map(|t| (*t).to_owned()).collect() };

    if head.starts_with("R:") {
        return Ok(None);
    }

    if head == "EL:" {
        let id = parse_id(rest.first())?;
        let (Some(qualified), Some(result)) = (rest.get(1), rest.get(2)) else {
            return Err(Error::Protocol(format!("short enhanced-log line: {line}")));
        };
        let Some((interface, method)) = qualified.split_once('.') else {
            return Err(Error::Protocol(format!("unqualified method in: {line}")));
        };
        return Ok(Some(Event {
            kind: EventKind::EnhancedLog,
            id,
            category: interface.to_owned(),
            method: Some(method.to_owned()),
            result: Some((*result).to_owned()),
            args: owned(rest.get(3..).unwrap_or_default()),
        }));
    }

    if let Some(category) = head.strip_prefix("S:") {
        if category.is_empty() {
            return Err(Error::Protocol(format!("empty status category: {line}")));
        }
        let id = parse_id(rest.first())?;
        return Ok(Some(Event {
            kind: EventKind::Status,
            id,
            category: category.to_owned(),
            method: None,
            result: None,
            args: owned(rest.get(1..).unwrap_or_default()),
        }));
    }

    Err(Error::Protocol(format!("unrecognised line: {line}")))
}

// ── ReconnectConfig ──────────────────────────────────────────────────

/// Exponential backoff configuration for event-stream reconnection.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Delay before the first reconnection attempt. Default: 1s.
    pub initial_delay: Duration,

    /// Upper bound on backoff delay. Default: 30s.
    pub max_delay: Duration,

    /// Maximum consecutive failed attempts before giving up.
    /// `None` means retry forever.
    pub max_retries: Option<u32>,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            max_retries: None,
        }
    }
}

/// Exponential backoff with jitter.
///
/// `delay = min(initial * 2^attempt, max) * (1 +- 0.25)`
#[allow(
    clippy::cast_possible_wrap,
    clippy::cast_possible_truncation,
    clippy::as_conversions
)]
pub(crate) fn calculate_backoff(attempt: u32, config: &ReconnectConfig) -> Duration {
    let exponent = attempt.min(30) as i32;
    let base = config.initial_delay.as_secs_f64() * 2.0_f64.powi(exponent);
    let capped = base.min(config.max_delay.as_secs_f64());

    // Deterministic spread seeded from the attempt number.
    let jitter_factor = 1.0 + 0.25 * (f64::from(attempt) * 7.3).sin();
    Duration::from_secs_f64((capped * jitter_factor).max(0.0))
}

// ── Connection state ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting { attempt: u32 },
    /// Retry budget exhausted; `start()` again to resume.
    Failed,
}

// ── EventStream ──────────────────────────────────────────────────────

/// Handle to the push-event connection.
///
/// Cheaply cloneable. Nothing is dialled until [`start`](Self::start).
#[derive(Clone)]
pub struct EventStream {
    inner: Arc<EventStreamInner>,
}

struct EventStreamInner {
    connector: Connector,
    reconnect: ReconnectConfig,
    subscribers: Arc<Subscribers<Event>>,
    status_categories: Mutex<BTreeSet<String>>,
    log_types: Mutex<BTreeSet<String>>,
    resync_tx: broadcast::Sender<u64>,
    state_tx: watch::Sender<ConnectionState>,
    running: tokio::sync::Mutex<Option<RunningTask>>,
    // Lines to write on the live connection, set while running.
    control_tx: Mutex<Option<mpsc::UnboundedSender<String>>>,
}

struct RunningTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl EventStream {
    pub fn new(connector: Connector, reconnect: ReconnectConfig) -> Self {
        let (resync_tx, _) = broadcast::channel(RESYNC_CHANNEL_CAPACITY);
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);

        Self {
            inner: Arc::new(EventStreamInner {
                connector,
                reconnect,
                subscribers: Subscribers::new("event-stream"),
                status_categories: Mutex::new(BTreeSet::new()),
                log_types: Mutex::new(BTreeSet::new()),
                resync_tx,
                state_tx,
                running: tokio::sync::Mutex::new(None),
                control_tx: Mutex::new(None),
            }),
        }
    }

    /// Register a callback for every event the predicate accepts.
    pub fn subscribe<P, F>(&self, predicate: P, callback: F) -> SubscriptionHandle
    where
        P: Fn(&Event) -> bool + Send + Sync + 'static,
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.inner.subscribers.subscribe(predicate, callback)
    }

    /// Subscribe to `S:<category>` pushes on this and every later connection.
    pub fn enable_status(&self, category: &str) {
        let category = category.to_ascii_uppercase();
        let added = lock(&self.inner.status_categories).insert(category.clone());
        if added {
            self.send_control(format!("STATUS {category}"));
        }
    }

    /// Enable enhanced-log pushes of the given log type.
    pub fn enable_enhanced_log(&self, log_type: &str) {
        let log_type = log_type.to_ascii_uppercase();
        let first = {
            let mut types = lock(&self.inner.log_types);
            let first = types.is_empty();
            if !types.insert(log_type.clone()) {
                return;
            }
            first
        };
        if first {
            self.send_control("ELENABLE 1".into());
        }
        self.send_control(format!("ELLOG {log_type} ON"));
    }

    fn send_control(&self, line: String) {
        if let Some(tx) = lock(&self.inner.control_tx).as_ref() {
            let _ = tx.send(line);
        }
    }

    /// Generation numbers, one per successful *re*connect.
    pub fn resyncs(&self) -> broadcast::Receiver<u64> {
        self.inner.resync_tx.subscribe()
    }

    pub fn connection_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state_tx.subscribe()
    }

    /// Spawn the connection task. A no-op while already running.
    pub async fn start(&self) {
        let mut running = self.inner.running.lock().await;
        if running.as_ref().is_some_and(|r| !r.handle.is_finished()) {
            return;
        }

        let (control_tx, control_rx) = mpsc::unbounded_channel();
        *lock(&self.inner.control_tx) = Some(control_tx);

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(event_loop(
            Arc::clone(&self.inner),
            control_rx,
            cancel.clone(),
        ));
        *running = Some(RunningTask { cancel, handle });
    }

    /// Cancel the task (including any backoff wait), release the
    /// connection and wait for the task to finish. Idempotent.
    pub async fn stop(&self) {
        let task = self.inner.running.lock().await.take();
        *lock(&self.inner.control_tx) = None;
        if let Some(RunningTask { cancel, handle }) = task {
            cancel.cancel();
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "event stream task panicked");
            }
        }
        self.inner.state_tx.send_replace(ConnectionState::Disconnected);
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.len()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ── Background reconnection loop ─────────────────────────────────────

/// Main loop: connect → handshake → read → backoff → reconnect.
///
/// Backoff applies to failed connects and to dropped sessions alike. The
/// attempt counter only resets after a session has delivered an event or
/// stayed up for [`STABLE_SESSION`].
async fn event_loop(
    inner: Arc<EventStreamInner>,
    mut control_rx: mpsc::UnboundedReceiver<String>,
    cancel: CancellationToken,
) {
    let mut attempt: u32 = 0;
    let mut sessions: u64 = 0;
    inner.state_tx.send_replace(ConnectionState::Connecting);

    loop {
        // The handshake below covers everything queued so far.
        while control_rx.try_recv().is_ok() {}

        let opened = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            result = open_session(&inner) => result,
        };

        match opened {
            Ok(conn) => {
                inner.state_tx.send_replace(ConnectionState::Connected);
                if sessions > 0 {
                    tracing::info!(generation = sessions, "event stream resynchronized");
                    let _ = inner.resync_tx.send(sessions);
                }
                sessions += 1;

                let started = Instant::now();
                let mut delivered: u64 = 0;
                match read_events(conn, &inner, &mut control_rx, &cancel, &mut delivered).await {
                    Ok(()) if cancel.is_cancelled() => break,
                    Ok(()) => tracing::info!(delivered, "event connection closed"),
                    Err(e) => tracing::warn!(error = %e, delivered, "event connection dropped"),
                }
                if delivered > 0 || started.elapsed() >= STABLE_SESSION {
                    attempt = 0;
                }
            }
            Err(e) => tracing::warn!(error = %e, attempt, "event connection failed"),
        }

        if let Some(max) = inner.reconnect.max_retries {
            if attempt >= max {
                tracing::error!(
                    max_retries = max,
                    "event stream reconnection limit reached, giving up"
                );
                inner.state_tx.send_replace(ConnectionState::Failed);
                return;
            }
        }

        inner
            .state_tx
            .send_replace(ConnectionState::Reconnecting { attempt: attempt.saturating_add(1) });
        let delay = calculate_backoff(attempt, &inner.reconnect);
        tracing::info!(
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            attempt,
            "waiting before reconnect"
        );

        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(delay) => {}
        }

        attempt = attempt.saturating_add(1);
    }

    inner.state_tx.send_replace(ConnectionState::Disconnected);
    tracing::debug!("event loop exiting");
}

/// Connect, log in and issue the subscription handshake.
async fn open_session(inner: &EventStreamInner) -> Result<Connection, Error> {
    let mut conn = inner.connector.connect().await?;

    let categories: Vec<String> = lock(&inner.status_categories).iter().cloned().collect();
    let log_types: Vec<String> = lock(&inner.log_types).iter().cloned().collect();

    for category in &categories {
        conn.send_line(&format!("STATUS {category}")).await?;
    }
    if !log_types.is_empty() {
        conn.send_line("ELENABLE 1").await?;
        for log_type in &log_types {
            conn.send_line(&format!("ELLOG {log_type} ON")).await?;
        }
    }

    tracing::debug!(?categories, ?log_types, "event subscriptions issued");
    Ok(conn)
}

enum Step {
    Cancelled,
    Control(Option<String>),
    Line(Result<Option<String>, Error>),
}

/// Read and dispatch lines until the connection drops or the task is
/// cancelled.
async fn read_events(
    mut conn: Connection,
    inner: &EventStreamInner,
    control_rx: &mut mpsc::UnboundedReceiver<String>,
    cancel: &CancellationToken,
    delivered: &mut u64,
) -> Result<(), Error> {
    let result = loop {
        let step = tokio::select! {
            biased;
            _ = cancel.cancelled() => Step::Cancelled,
            line = control_rx.recv() => Step::Control(line),
            line = conn.read_line() => Step::Line(line),
        };

        match step {
            Step::Cancelled => break Ok(()),
            Step::Control(Some(line)) => {
                if let Err(e) = conn.send_line(&line).await {
                    break Err(e);
                }
            }
            // Sender dropped by `stop()`; cancellation follows.
            Step::Control(None) => {
                cancel.cancelled().await;
                break Ok(());
            }
            Step::Line(Ok(Some(line))) => {
                if handle_line(inner, &line) {
                    *delivered += 1;
                }
            }
            Step::Line(Ok(None)) => break Ok(()),
            Step::Line(Err(e)) => break Err(e),
        }
    };

    conn.close().await;
    result
}

/// Returns whether the line was an event.
fn handle_line(inner: &EventStreamInner, line: &str) -> bool {
    match parse_line(line) {
        Ok(Some(event)) => {
            let delivered = inner.subscribers.dispatch(&event);
            tracing::trace!(id = event.id, category = %event.category, delivered, "event");
            true
        }
        Ok(None) if line.starts_with("R:ERROR") => {
            tracing::warn!(line, "controller rejected event subscription");
            false
        }
        Ok(None) => {
            tracing::trace!(line, "acknowledgement");
            false
        }
        Err(e) => {
            tracing::debug!(error = %e, "dropping unparseable line");
            false
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────
