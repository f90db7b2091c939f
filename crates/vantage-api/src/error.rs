use std::time::Duration;

use thiserror::Error;

use crate::codec::DecodeError;

/// Top-level error type for the `vantage-api` crate.
///
/// Covers every failure mode of the host-command protocol: the socket,
/// the TLS layer, login, malformed lines, controller-reported errors and
/// request deadlines. `vantage-core` wraps these for its consumers.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// Socket-level failure (connection refused, reset, DNS failure, etc.)
    #[error("Transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// TLS handshake or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Authentication ──────────────────────────────────────────────
    /// Login was rejected by the controller.
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    // ── Protocol ────────────────────────────────────────────────────
    /// A line that does not fit the wire grammar.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The controller answered `R:ERROR:<code>` or a non-zero result code.
    #[error("Command failed (code {code}): {message}")]
    Command { code: i32, message: String },

    /// A reply argument could not be decoded into the requested type.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    // ── Lifecycle ───────────────────────────────────────────────────
    /// No reply arrived before the request deadline.
    #[error("Request timed out after {}ms", timeout.as_millis())]
    Timeout { timeout: Duration },

    /// The connection dropped while the request was outstanding or queued.
    #[error("Connection lost")]
    ConnectionLost,

    /// The client was closed.
    #[error("Client closed")]
    Closed,
}

impl Error {
    /// Returns `true` if the failure is tied to the connection rather than
    /// the request, so reissuing the same request may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::Timeout { .. } | Self::ConnectionLost
        )
    }

    /// Controller error code, if the controller reported one.
    pub fn command_code(&self) -> Option<i32> {
        match self {
            Self::Command { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Build a `Command` error from an `R:ERROR:<code> <message>` line.
    pub(crate) fn from_error_reply(line: &str) -> Self {
        let rest = line.strip_prefix("R:ERROR:").unwrap_or(line);
        let (code, message) = rest.split_once(' ').unwrap_or((rest, ""));
        match code.trim().parse() {
            Ok(code) => Self::Command {
                code,
                message: message.trim().to_owned(),
            },
            Err(_) => Self::Protocol(format!("malformed error reply: {line}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_error_reply() {
        let err = Error::from_error_reply("R:ERROR:7 Invalid object");
        assert_eq!(err.command_code(), Some(7));
        assert_eq!(err.to_string(), "Command failed (code 7): Invalid object");
    }

    #[test]
    fn malformed_error_reply_is_protocol() {
        let err = Error::from_error_reply("R:ERROR:x nope");
        assert!(matches!(err, Error::Protocol(_)));
    }

    #[test]
    fn transient_classification() {
        assert!(Error::ConnectionLost.is_transient());
        assert!(
            Error::Timeout {
                timeout: Duration::from_secs(1)
            }
            .is_transient()
        );
        assert!(
            !Error::Command {
                code: 1,
                message: String::new()
            }
            .is_transient()
        );
    }
}
