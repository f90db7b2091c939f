// ── Command client ──
//
// Every request flows through an mpsc channel to a single processor task
// that owns the command connection. The processor writes one request,
// waits for its reply (or the deadline), answers the caller's oneshot and
// only then takes the next request, so wire order equals admission order
// and at most one request is ever in flight.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::codec::{self, DecodeError, Value, WireType, tokenize};
use crate::connection::{Connection, Connector};
use crate::error::Error;

const COMMAND_CHANNEL_SIZE: usize = 64;

/// Default per-request deadline.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

// ── Responses ────────────────────────────────────────────────────────

/// Decoded `R:INVOKE <id> <result> <Interface.Method> [args...]` reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceResponse {
    pub id: u32,
    /// Raw result token; the method's return value or status code.
    pub result: String,
    pub method: String,
    pub args: Vec<String>,
}

impl InterfaceResponse {
    fn parse(line: &str) -> Result<Self, Error> {
        let tokens = tokenize(line);
        let [_, id, result, method, args @ ..] = tokens.as_slice() else {
            return Err(Error::Protocol(format!("short INVOKE reply: {line}")));
        };
        Ok(Self {
            id: id
                .parse()
                .map_err(|_| Error::Protocol(format!("bad object id in reply: {line}")))?,
            result: (*result).to_owned(),
            method: (*method).to_owned(),
            args: args.iter().map(|s| (*s).to_owned()).collect(),
        })
    }

    /// Decode the result token.
    pub fn result_as<T: WireType>(&self) -> Result<T, Error> {
        Ok(codec::decode(&self.result)?)
    }

    /// Decode the reply argument at `index`.
    pub fn arg<T: WireType>(&self, index: usize) -> Result<T, Error> {
        let token = self
            .args
            .get(index)
            .ok_or_else(|| DecodeError::new("", T::TYPE_NAME))?;
        Ok(codec::decode(token)?)
    }

    /// Status code of a set-style method.
    pub fn rcode(&self) -> Result<i32, Error> {
        self.result_as()
    }

    /// Fail with [`Error::Command`] when a set-style method reports a
    /// non-zero status code.
    pub fn check(self) -> Result<Self, Error> {
        match self.rcode()? {
            0 => Ok(self),
            code => Err(Error::Command {
                code,
                message: format!("{} returned {code} for object {}", self.method, self.id),
            }),
        }
    }
}

/// Reply to a plain host command, `R:<KEYWORD> [args...]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResponse {
    pub keyword: String,
    pub args: Vec<String>,
}

impl CommandResponse {
    fn parse(line: &str) -> Self {
        let mut tokens = tokenize(line).into_iter();
        let keyword = tokens
            .next()
            .map(|t| t.trim_start_matches("R:").to_owned())
            .unwrap_or_default();
        Self {
            keyword,
            args: tokens.map(str::to_owned).collect(),
        }
    }

    pub fn arg<T: WireType>(&self, index: usize) -> Result<T, Error> {
        let token = self
            .args
            .get(index)
            .ok_or_else(|| DecodeError::new("", T::TYPE_NAME))?;
        Ok(codec::decode(token)?)
    }
}

// ── Request envelope ─────────────────────────────────────────────────

/// Which reply line answers a request: the `R:` keyword plus a few
/// positional tokens that must match (object id, method name).
#[derive(Debug, Clone)]
struct ReplyPattern {
    keyword: String,
    fields: Vec<(usize, String)>,
}

impl ReplyPattern {
    fn matches(&self, line: &str) -> bool {
        let tokens = tokenize(line);
        tokens.first().is_some_and(|k| k.eq_ignore_ascii_case(&self.keyword))
            && self.fields.iter().all(|(i, want)| {
                tokens
                    .get(*i)
                    .is_some_and(|got| got.eq_ignore_ascii_case(want))
            })
    }
}

struct CommandEnvelope {
    line: String,
    reply: ReplyPattern,
    response_tx: oneshot::Sender<Result<String, Error>>,
}

impl CommandEnvelope {
    fn fail(self, err: Error) {
        let _ = self.response_tx.send(Err(err));
    }
}

// ── CommandClient ────────────────────────────────────────────────────

/// Multiplexes typed method invocations over one command connection.
///
/// Cheaply cloneable. The connection is opened lazily by the first
/// request and re-opened by the first request after a drop.
#[derive(Clone)]
pub struct CommandClient {
    inner: Arc<CommandClientInner>,
}

struct CommandClientInner {
    command_tx: mpsc::Sender<CommandEnvelope>,
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl CommandClient {
    /// Spawn the processor task. Must be called inside a Tokio runtime.
    pub fn new(connector: Connector, request_timeout: Duration) -> Self {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_SIZE);
        let cancel = CancellationToken::new();

        let task = tokio::spawn(command_processor_task(
            connector,
            request_timeout,
            command_rx,
            cancel.clone(),
        ));

        Self {
            inner: Arc::new(CommandClientInner {
                command_tx,
                cancel,
                task: Mutex::new(Some(task)),
            }),
        }
    }

    /// `INVOKE <id> <method> [args...]` → `R:INVOKE <id> <result> <method> ...`.
    pub async fn invoke(
        &self,
        id: u32,
        method: &str,
        args: &[String],
    ) -> Result<InterfaceResponse, Error> {
        let mut line = format!("INVOKE {id} {method}");
        for arg in args {
            line.push(' ');
            line.push_str(arg);
        }
        let reply = ReplyPattern {
            keyword: "R:INVOKE".into(),
            fields: vec![(1, id.to_string()), (3, method.to_owned())],
        };
        let reply_line = self.submit(line, reply).await?;
        InterfaceResponse::parse(&reply_line)
    }

    /// Send a non-INVOKE host command and wait for `R:<KEYWORD>`.
    pub async fn command(&self, keyword: &str, args: &[String]) -> Result<CommandResponse, Error> {
        let mut line = keyword.to_owned();
        for arg in args {
            line.push(' ');
            line.push_str(arg);
        }
        let reply = ReplyPattern {
            keyword: format!("R:{keyword}"),
            fields: Vec::new(),
        };
        let reply_line = self.submit(line, reply).await?;
        Ok(CommandResponse::parse(&reply_line))
    }

    /// `GETVARIABLE <id>` → the variable's current value.
    pub async fn get_variable(&self, id: u32) -> Result<Value, Error> {
        let reply = ReplyPattern {
            keyword: "R:GETVARIABLE".into(),
            fields: vec![(1, id.to_string())],
        };
        let line = self.submit(format!("GETVARIABLE {id}"), reply).await?;
        CommandResponse::parse(&line).arg(1)
    }

    /// `VARIABLE <id> <value>`.
    pub async fn set_variable(&self, id: u32, value: &Value) -> Result<(), Error> {
        let reply = ReplyPattern {
            keyword: "R:VARIABLE".into(),
            fields: vec![(1, id.to_string())],
        };
        self.submit(format!("VARIABLE {id} {}", value.encode()), reply)
            .await?;
        Ok(())
    }

    async fn submit(&self, line: String, reply: ReplyPattern) -> Result<String, Error> {
        if self.inner.cancel.is_cancelled() {
            return Err(Error::Closed);
        }

        let (response_tx, response_rx) = oneshot::channel();
        self.inner
            .command_tx
            .send(CommandEnvelope {
                line,
                reply,
                response_tx,
            })
            .await
            .map_err(|_| Error::Closed)?;

        response_rx.await.map_err(|_| Error::ConnectionLost)?
    }

    /// Fail every outstanding and queued request with
    /// [`Error::ConnectionLost`] and release the connection. Idempotent.
    pub async fn close(&self) {
        self.inner.cancel.cancel();
        let handle = self.inner.task.lock().await.take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!(error = %e, "command processor task panicked");
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.inner.cancel.is_cancelled()
    }
}

// ── Processor task ───────────────────────────────────────────────────

async fn command_processor_task(
    connector: Connector,
    request_timeout: Duration,
    mut rx: mpsc::Receiver<CommandEnvelope>,
    cancel: CancellationToken,
) {
    let mut conn: Option<Connection> = None;
    // A request on `conn` timed out and its reply may still arrive.
    let mut abandoned = false;

    loop {
        let envelope = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            envelope = rx.recv() => match envelope {
                Some(envelope) => envelope,
                None => break,
            },
        };

        if envelope.response_tx.is_closed() {
            trace!(line = %envelope.line, "caller gave up before send, skipping");
            continue;
        }

        if conn.is_none() {
            let connected = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    envelope.fail(Error::ConnectionLost);
                    break;
                }
                result = connector.connect() => result,
            };
            match connected {
                Ok(fresh) => {
                    conn = Some(fresh);
                    abandoned = false;
                }
                Err(e) => {
                    warn!(error = %e, "command connection failed");
                    envelope.fail(e);
                    continue;
                }
            }
        }
        let Some(active) = conn.as_mut() else {
            continue;
        };

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                envelope.fail(Error::ConnectionLost);
                break;
            }
            outcome = exchange(active, &envelope, request_timeout, &mut abandoned) => outcome,
        };

        match outcome {
            Err(Error::Transport(e)) => {
                warn!(error = %e, "command connection dropped");
                on_connection_lost(&mut conn, &mut rx, envelope).await;
            }
            Err(Error::ConnectionLost) => {
                info!("command connection closed by controller");
                on_connection_lost(&mut conn, &mut rx, envelope).await;
            }
            result => {
                let _ = envelope.response_tx.send(result);
            }
        }
    }

    rx.close();
    while let Some(envelope) = rx.recv().await {
        envelope.fail(Error::ConnectionLost);
    }
    if let Some(active) = conn.take() {
        active.close().await;
    }
    debug!("command processor exiting");
}

/// Write one request and read until its reply, an error reply, EOF or
/// the deadline.
///
/// Replies carry no correlation id. A late reply to a request that timed
/// out is charged to the next request: any `R:ERROR`, or an `R:INVOKE`
/// whose id and method match. `abandoned` marks that window so the
/// attribution is logged.
///
/// A deadline that fires mid-write leaves a partial line on the wire and
/// is reported as [`Error::ConnectionLost`]. A deadline while waiting for
/// the reply leaves the connection usable.
async fn exchange(
    conn: &mut Connection,
    envelope: &CommandEnvelope,
    timeout: Duration,
    abandoned: &mut bool,
) -> Result<String, Error> {
    let deadline = Instant::now() + timeout;

    if let Ok(sent) = tokio::time::timeout_at(deadline, conn.send_line(&envelope.line)).await {
        sent?;
    } else {
        warn!(line = %envelope.line, ?timeout, "request timed out mid-write");
        return Err(Error::ConnectionLost);
    }

    let stale = *abandoned;
    let reply = async {
        loop {
            let Some(line) = conn.read_line().await? else {
                return Err(Error::ConnectionLost);
            };
            if line.starts_with("R:ERROR") {
                if stale {
                    debug!(
                        line,
                        request = %envelope.line,
                        "error reply may belong to a timed-out request"
                    );
                }
                return Err(Error::from_error_reply(&line));
            }
            if envelope.reply.matches(&line) {
                if stale {
                    debug!(line, request = %envelope.line, "reply may belong to a timed-out request");
                }
                return Ok(line);
            }
            debug!(line, expected = %envelope.reply.keyword, "dropping unmatched line");
        }
    };

    if let Ok(result) = tokio::time::timeout_at(deadline, reply).await {
        *abandoned = false;
        result
    } else {
        warn!(line = %envelope.line, ?timeout, "request timed out");
        *abandoned = true;
        Err(Error::Timeout { timeout })
    }
}

/// Fail the in-flight request and everything queued behind it, then
/// discard the connection so the next request reconnects.
async fn on_connection_lost(
    conn: &mut Option<Connection>,
    rx: &mut mpsc::Receiver<CommandEnvelope>,
    in_flight: CommandEnvelope,
) {
    in_flight.fail(Error::ConnectionLost);
    let mut drained = 0_usize;
    while let Ok(envelope) = rx.try_recv() {
        envelope.fail(Error::ConnectionLost);
        drained += 1;
    }
    if drained > 0 {
        debug!(drained, "failed queued requests after connection loss");
    }
    if let Some(dead) = conn.take() {
        dead.close().await;
    }
}
