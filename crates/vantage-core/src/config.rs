// ── Runtime connection configuration ──
//
// These types describe *how* to reach a controller. They carry credential
// data and connection tuning, but never touch disk. The monitor binary (or
// any other consumer) builds a `ClientConfig` and hands it in.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use vantage_api::connection::{Credentials, DEFAULT_PORT, DEFAULT_TLS_PORT};
use vantage_api::{ConnectionConfig, ReconnectConfig, TlsMode};

/// Login sent on every new connection.
#[derive(Debug, Clone)]
pub struct AuthCredentials {
    pub username: String,
    pub password: SecretString,
}

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// Plain TCP on the host-command port.
    #[default]
    Disabled,
    /// Bundled web PKI roots (strict).
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(PathBuf),
    /// Skip verification (self-signed controller certificates).
    DangerAcceptInvalid,
}

/// Configuration for one controller.
///
/// Built by the caller and passed to [`Vantage`](crate::Vantage); core never
/// reads config files.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub host: String,
    /// Defaults to 3001, or 3010 with TLS.
    pub port: Option<u16>,
    pub auth: Option<AuthCredentials>,
    pub tls: TlsVerification,
    pub connect_timeout: Duration,
    /// Per-request deadline on the command connection.
    pub request_timeout: Duration,
    /// Backoff for the event connection only.
    pub reconnect: ReconnectConfig,
    /// Query every object's state during `initialize`.
    pub fetch_state: bool,
    /// Keep objects current from the event stream.
    pub monitor_state: bool,
}

impl ClientConfig {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: None,
            auth: None,
            tls: TlsVerification::default(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: vantage_api::command::DEFAULT_REQUEST_TIMEOUT,
            reconnect: ReconnectConfig::default(),
            fetch_state: true,
            monitor_state: true,
        }
    }

    pub fn port(&self) -> u16 {
        self.port.unwrap_or(if self.tls == TlsVerification::Disabled {
            DEFAULT_PORT
        } else {
            DEFAULT_TLS_PORT
        })
    }

    pub(crate) fn connection_config(&self) -> ConnectionConfig {
        let mut config = ConnectionConfig::new(self.host.clone());
        config.port = Some(self.port());
        config.tls = tls_to_transport(&self.tls);
        config.connect_timeout = self.connect_timeout;
        config.credentials = self.auth.as_ref().map(|auth| Credentials {
            username: auth.username.clone(),
            password: auth.password.clone(),
        });
        config
    }
}

fn tls_to_transport(tls: &TlsVerification) -> TlsMode {
    match tls {
        TlsVerification::Disabled => TlsMode::Disabled,
        TlsVerification::SystemDefaults => TlsMode::System,
        TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
        TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
    }
}
