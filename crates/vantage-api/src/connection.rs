//! Line-oriented transport to a controller.
//!
//! A [`Connection`] owns exactly one socket (plain TCP or TLS), performs
//! the login handshake and exchanges newline-terminated ASCII lines. It
//! never retries; reconnect policy belongs to the command client and the
//! event stream.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures_util::Stream;
use rustls::ClientConfig;
use secrecy::{ExposeSecret, SecretString};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tracing::{debug, info, trace};

use crate::codec::WireType;
use crate::error::Error;
use crate::transport::{self, TlsMode};

/// Default host-command port for plain TCP.
pub const DEFAULT_PORT: u16 = 3001;

/// Default host-command port for TLS.
pub const DEFAULT_TLS_PORT: u16 = 3010;

// ── Configuration ────────────────────────────────────────────────────

/// Login credentials for the controller.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Everything needed to open one connection.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    pub host: String,
    /// Explicit port; `None` picks the default for the TLS mode.
    pub port: Option<u16>,
    pub tls: TlsMode,
    pub credentials: Option<Credentials>,
    /// Bounds TCP connect, TLS handshake and login together.
    pub connect_timeout: Duration,
}

impl ConnectionConfig {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: None,
            tls: TlsMode::Disabled,
            credentials: None,
            connect_timeout: Duration::from_secs(10),
        }
    }

    pub fn port(&self) -> u16 {
        self.port.unwrap_or(if self.tls.is_enabled() {
            DEFAULT_TLS_PORT
        } else {
            DEFAULT_PORT
        })
    }
}

/// Pre-built connector shared by every connection dialling the same
/// controller, so the TLS config (and CA file) is loaded once.
#[derive(Clone)]
pub struct Connector {
    config: Arc<ConnectionConfig>,
    tls: Option<Arc<ClientConfig>>,
}

impl fmt::Debug for Connector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connector")
            .field("config", &self.config)
            .field("tls", &self.tls.is_some())
            .finish()
    }
}

impl Connector {
    pub fn new(config: ConnectionConfig) -> Result<Self, Error> {
        let tls = config.tls.client_config()?;
        Ok(Self {
            config: Arc::new(config),
            tls,
        })
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Open a connection and log in, bounded by the connect timeout.
    pub async fn connect(&self) -> Result<Connection, Error> {
        let timeout = self.config.connect_timeout;
        tokio::time::timeout(timeout, self.connect_inner())
            .await
            .map_err(|_| Error::Timeout { timeout })?
    }

    async fn connect_inner(&self) -> Result<Connection, Error> {
        let host = self.config.host.as_str();
        let port = self.config.port();
        debug!(host, port, tls = self.tls.is_some(), "connecting");

        let tcp = TcpStream::connect((host, port)).await?;
        tcp.set_nodelay(true)?;
        let peer = format!("{host}:{port}");

        let stream: Box<dyn LineIo> = match &self.tls {
            None => Box::new(tcp),
            Some(tls) => {
                let name = transport::server_name(host)?;
                let stream = TlsConnector::from(Arc::clone(tls))
                    .connect(name, tcp)
                    .await
                    .map_err(|e| Error::Tls(format!("TLS handshake failed: {e}")))?;
                Box::new(stream)
            }
        };

        let mut conn = Connection::from_stream(stream, peer);
        if let Some(credentials) = &self.config.credentials {
            conn.login(credentials).await?;
        }
        info!(peer = %conn.peer, "connected");
        Ok(conn)
    }
}

// ── Connection ───────────────────────────────────────────────────────

trait LineIo: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> LineIo for T {}

/// One open socket speaking the line protocol.
pub struct Connection {
    stream: BufReader<Box<dyn LineIo>>,
    // Bytes of a line not yet terminated; survives cancelled reads.
    partial: Vec<u8>,
    peer: String,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection").field("peer", &self.peer).finish()
    }
}

impl Connection {
    /// Open a one-off connection. Prefer [`Connector`] when dialling
    /// repeatedly.
    pub async fn open(config: ConnectionConfig) -> Result<Self, Error> {
        Connector::new(config)?.connect().await
    }

    /// Wrap an already-connected stream (plain TCP, TLS, or an in-memory
    /// duplex in tests).
    pub fn from_io<S>(io: S, peer: impl Into<String>) -> Self
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        Self::from_stream(Box::new(io), peer.into())
    }

    fn from_stream(stream: Box<dyn LineIo>, peer: String) -> Self {
        Self {
            stream: BufReader::new(stream),
            partial: Vec::new(),
            peer,
        }
    }

    pub fn peer(&self) -> &str {
        &self.peer
    }

    /// `LOGIN <user> <password>`; `R:LOGIN` accepts, `R:ERROR` rejects.
    pub async fn login(&mut self, credentials: &Credentials) -> Result<(), Error> {
        let user = credentials.username.encode();
        let pass = credentials.password.expose_secret().to_owned().encode();
        self.write_raw(&format!("LOGIN {user} {pass}")).await?;
        trace!(peer = %self.peer, "LOGIN sent");

        loop {
            let Some(line) = self.read_line().await? else {
                return Err(Error::ConnectionLost);
            };
            if line.starts_with("R:LOGIN") {
                debug!(peer = %self.peer, user = %credentials.username, "logged in");
                return Ok(());
            }
            if line.starts_with("R:ERROR") {
                let message = match Error::from_error_reply(&line) {
                    Error::Command { code, message } => format!("code {code}: {message}"),
                    _ => line,
                };
                return Err(Error::Authentication { message });
            }
            // Status pushes can race ahead of the login reply.
            trace!(peer = %self.peer, line, "skipping line before login reply");
        }
    }

    /// Send one line; the terminator is appended here.
    pub async fn send_line(&mut self, line: &str) -> Result<(), Error> {
        trace!(peer = %self.peer, line, "send");
        self.write_raw(line).await
    }

    async fn write_raw(&mut self, line: &str) -> Result<(), Error> {
        let stream = self.stream.get_mut();
        stream.write_all(line.as_bytes()).await?;
        stream.write_all(b"\r\n").await?;
        stream.flush().await?;
        Ok(())
    }

    /// Next non-empty line with `\r\n`/`\n` stripped; `None` at EOF.
    ///
    /// Cancel-safe: a partially received line is kept for the next call.
    pub async fn read_line(&mut self) -> Result<Option<String>, Error> {
        loop {
            let n = self.stream.read_until(b'\n', &mut self.partial).await?;

            if self.partial.last() == Some(&b'\n') {
                let mut raw = std::mem::take(&mut self.partial);
                raw.pop();
                if raw.last() == Some(&b'\r') {
                    raw.pop();
                }
                if raw.is_empty() {
                    continue;
                }
                let line = String::from_utf8_lossy(&raw).into_owned();
                trace!(peer = %self.peer, line, "recv");
                return Ok(Some(line));
            }

            if n == 0 {
                if !self.partial.is_empty() {
                    debug!(
                        peer = %self.peer,
                        bytes = self.partial.len(),
                        "discarding unterminated line at EOF"
                    );
                    self.partial.clear();
                }
                return Ok(None);
            }
        }
    }

    /// Consume the connection into a stream of received lines.
    pub fn into_lines(mut self) -> impl Stream<Item = Result<String, Error>> + Send {
        async_stream::try_stream! {
            while let Some(line) = self.read_line().await? {
                yield line;
            }
        }
    }

    /// Shut down the write side and drop the socket.
    pub async fn close(mut self) {
        if let Err(e) = self.stream.get_mut().shutdown().await {
            debug!(peer = %self.peer, error = %e, "shutdown failed");
        }
    }
}
