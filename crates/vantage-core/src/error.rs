// ── Core error types ──
//
// User-facing errors from vantage-core. Consumers never match on raw
// wire-level failures; the `From<vantage_api::Error>` impl translates
// transport-layer errors into domain-appropriate variants.

use thiserror::Error;

use crate::model::ObjectId;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to controller: {reason}")]
    ConnectionFailed { reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Controller disconnected")]
    ControllerDisconnected,

    #[error("Controller request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Client is closed")]
    Closed,

    // ── Command errors ───────────────────────────────────────────────
    #[error("Command rejected by controller (code {code}): {message}")]
    CommandFailed { code: i32, message: String },

    #[error("Protocol error: {message}")]
    Protocol { message: String },

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Object not found: {id}")]
    ObjectNotFound { id: ObjectId },

    #[error("Registry conflict: {message}")]
    Registry { message: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CoreError {
    /// Worth retrying once the link is back.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::ConnectionFailed { .. } | Self::ControllerDisconnected | Self::Timeout { .. }
        )
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<vantage_api::Error> for CoreError {
    fn from(err: vantage_api::Error) -> Self {
        match err {
            vantage_api::Error::Transport(e) => CoreError::ConnectionFailed {
                reason: e.to_string(),
            },
            vantage_api::Error::Tls(msg) => CoreError::ConnectionFailed {
                reason: format!("TLS error: {msg}"),
            },
            vantage_api::Error::Authentication { message } => {
                CoreError::AuthenticationFailed { message }
            }
            vantage_api::Error::Protocol(message) => CoreError::Protocol { message },
            vantage_api::Error::Command { code, message } => {
                CoreError::CommandFailed { code, message }
            }
            vantage_api::Error::Decode(e) => CoreError::Protocol {
                message: e.to_string(),
            },
            vantage_api::Error::Timeout { timeout } => CoreError::Timeout {
                timeout_secs: timeout.as_secs(),
            },
            vantage_api::Error::ConnectionLost => CoreError::ControllerDisconnected,
            vantage_api::Error::Closed => CoreError::Closed,
        }
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::Config {
            message: format!("invalid object catalog: {err}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn api_errors_map_to_domain_variants() {
        let lost: CoreError = vantage_api::Error::ConnectionLost.into();
        assert!(matches!(lost, CoreError::ControllerDisconnected));
        assert!(lost.is_transient());

        let timeout: CoreError = vantage_api::Error::Timeout {
            timeout: Duration::from_secs(10),
        }
        .into();
        assert!(matches!(timeout, CoreError::Timeout { timeout_secs: 10 }));

        let rejected: CoreError = vantage_api::Error::Command {
            code: 7,
            message: "Invalid object".into(),
        }
        .into();
        assert!(matches!(rejected, CoreError::CommandFailed { code: 7, .. }));
        assert!(!rejected.is_transient());
    }
}
