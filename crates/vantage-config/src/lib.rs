//! Shared configuration for Vantage tools.
//!
//! TOML profiles, credential resolution (env + plaintext) and translation
//! to `vantage_core::ClientConfig`. Core itself never reads files; binaries
//! go through this crate.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use vantage_core::{AuthCredentials, ClientConfig, TlsVerification};

const USERNAME_ENV: &str = "VANTAGE_USERNAME";
const PASSWORD_ENV: &str = "VANTAGE_PASSWORD";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{profile}' not found")]
    UnknownProfile { profile: String },

    #[error("no password configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named controller profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// Name of the profile to use: the explicit one, else the default.
    pub fn active_profile_name<'a>(&'a self, requested: Option<&'a str>) -> &'a str {
        requested
            .or(self.default_profile.as_deref())
            .unwrap_or("default")
    }

    pub fn profile(&self, name: &str) -> Result<&Profile, ConfigError> {
        self.profiles
            .get(name)
            .ok_or_else(|| ConfigError::UnknownProfile {
                profile: name.into(),
            })
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64,

    /// Query every object's state on startup.
    #[serde(default = "default_true")]
    pub fetch_state: bool,

    /// Follow the event stream after startup.
    #[serde(default = "default_true")]
    pub monitor_state: bool,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            connect_timeout: default_connect_timeout(),
            fetch_state: true,
            monitor_state: true,
        }
    }
}

fn default_timeout() -> u64 {
    30
}
fn default_connect_timeout() -> u64 {
    10
}
fn default_true() -> bool {
    true
}

/// A named controller profile.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Profile {
    /// Controller hostname or IP address.
    pub host: String,

    /// Override the port (3001 plain, 3010 TLS).
    pub port: Option<u16>,

    /// Connect over TLS.
    #[serde(default)]
    pub tls: bool,

    /// Accept self-signed controller certificates.
    #[serde(default)]
    pub insecure: bool,

    /// Path to a custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Login user. Controllers without authentication leave this unset.
    pub username: Option<String>,

    /// Password (plaintext; prefer an env var).
    pub password: Option<String>,

    /// Environment variable holding the password.
    pub password_env: Option<String>,

    /// JSON object catalog (`[{"id": .., "type": ..}, ...]`).
    pub catalog: Option<PathBuf>,

    /// Override the request timeout.
    pub timeout: Option<u64>,

    pub fetch_state: Option<bool>,
    pub monitor_state: Option<bool>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "vantage", "vantage").map_or_else(
        || {
            let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
            p.push(".config");
            p.push("vantage");
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Defaults, then the TOML file at `path` (if present), then `VANTAGE_*`
/// variables (`VANTAGE_DEFAULTS__TIMEOUT=5`).
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("VANTAGE_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

/// Serialize config to TOML and write it to `path`.
pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution ───────────────────────────────────────────

/// Resolve login credentials from the process environment and profile.
///
/// `Ok(None)` when no username is configured anywhere: the controller is
/// reached without logging in.
pub fn resolve_auth(
    profile: &Profile,
    profile_name: &str,
) -> Result<Option<AuthCredentials>, ConfigError> {
    resolve_auth_with(profile, profile_name, |name| std::env::var(name).ok())
}

/// [`resolve_auth`] with an explicit environment lookup.
///
/// Password order: the profile's `password_env` variable, then
/// `VANTAGE_PASSWORD`, then the plaintext `password`.
pub fn resolve_auth_with(
    profile: &Profile,
    profile_name: &str,
    env: impl Fn(&str) -> Option<String>,
) -> Result<Option<AuthCredentials>, ConfigError> {
    let Some(username) = profile.username.clone().or_else(|| env(USERNAME_ENV)) else {
        return Ok(None);
    };

    let password = profile
        .password_env
        .as_deref()
        .and_then(&env)
        .or_else(|| env(PASSWORD_ENV))
        .or_else(|| profile.password.clone())
        .ok_or_else(|| ConfigError::NoCredentials {
            profile: profile_name.into(),
        })?;

    Ok(Some(AuthCredentials {
        username,
        password: SecretString::from(password),
    }))
}

fn resolve_tls(profile: &Profile) -> Result<TlsVerification, ConfigError> {
    if !profile.tls {
        if profile.insecure || profile.ca_cert.is_some() {
            return Err(ConfigError::Validation {
                field: "tls".into(),
                reason: "`insecure` and `ca_cert` require `tls = true`".into(),
            });
        }
        return Ok(TlsVerification::Disabled);
    }

    Ok(if profile.insecure {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    })
}

/// Build a `ClientConfig` from a profile and the global defaults.
pub fn profile_to_client_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<ClientConfig, ConfigError> {
    if profile.host.trim().is_empty() {
        return Err(ConfigError::Validation {
            field: "host".into(),
            reason: format!("profile '{profile_name}' has no host"),
        });
    }

    let mut config = ClientConfig::new(profile.host.trim());
    config.port = profile.port;
    config.tls = resolve_tls(profile)?;
    config.auth = resolve_auth(profile, profile_name)?;
    config.request_timeout = Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout));
    config.connect_timeout = Duration::from_secs(defaults.connect_timeout);
    config.fetch_state = profile.fetch_state.unwrap_or(defaults.fetch_state);
    config.monitor_state = profile.monitor_state.unwrap_or(defaults.monitor_state);
    Ok(config)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;

    fn profile(host: &str) -> Profile {
        Profile {
            host: host.into(),
            ..Profile::default()
        }
    }

    #[test]
    fn no_username_means_no_login() {
        let auth = resolve_auth_with(&profile("h"), "home", |_| None).unwrap();
        assert!(auth.is_none());
    }

    #[test]
    fn password_env_beats_global_env_and_plaintext() {
        let mut p = profile("h");
        p.username = Some("admin".into());
        p.password = Some("plain".into());
        p.password_env = Some("HOME_PW".into());

        let env = |name: &str| match name {
            "HOME_PW" => Some("from-profile-env".to_owned()),
            PASSWORD_ENV => Some("from-global-env".to_owned()),
            _ => None,
        };
        let auth = resolve_auth_with(&p, "home", env).unwrap().unwrap();
        assert_eq!(auth.username, "admin");
        assert_eq!(auth.password.expose_secret(), "from-profile-env");

        let auth = resolve_auth_with(&p, "home", |_| None).unwrap().unwrap();
        assert_eq!(auth.password.expose_secret(), "plain");
    }

    #[test]
    fn username_without_password_is_an_error() {
        let env = |name: &str| (name == USERNAME_ENV).then(|| "admin".to_owned());
        let err = resolve_auth_with(&profile("h"), "home", env).unwrap_err();
        assert!(matches!(err, ConfigError::NoCredentials { profile } if profile == "home"));
    }

    #[test]
    fn tls_options_require_tls() {
        let mut p = profile("h");
        assert_eq!(resolve_tls(&p).unwrap(), TlsVerification::Disabled);

        p.insecure = true;
        assert!(resolve_tls(&p).is_err());

        p.tls = true;
        assert_eq!(resolve_tls(&p).unwrap(), TlsVerification::DangerAcceptInvalid);

        p.insecure = false;
        p.ca_cert = Some("/etc/vantage/ca.pem".into());
        assert_eq!(
            resolve_tls(&p).unwrap(),
            TlsVerification::CustomCa("/etc/vantage/ca.pem".into())
        );
    }

    #[test]
    fn active_profile_falls_back_to_default() {
        let mut cfg = Config::default();
        assert_eq!(cfg.active_profile_name(None), "default");
        assert_eq!(cfg.active_profile_name(Some("lab")), "lab");

        cfg.default_profile = Some("home".into());
        assert_eq!(cfg.active_profile_name(None), "home");
        assert!(matches!(
            cfg.profile("home"),
            Err(ConfigError::UnknownProfile { .. })
        ));
    }
}
