#![allow(clippy::unwrap_used)]
// Loading profiles from TOML files on disk.

use std::time::Duration;

use pretty_assertions::assert_eq;
use tempfile::TempDir;

use vantage_config::{
    Config, ConfigError, Profile, load_config_from, profile_to_client_config, save_config_to,
};
use vantage_core::TlsVerification;

const SAMPLE: &str = r#"
default_profile = "home"

[defaults]
timeout = 12

[profiles.home]
host = "192.168.1.20"
catalog = "/etc/vantage/home.json"
monitor_state = false

[profiles.office]
host = "vantage.office.lan"
tls = true
insecure = true
timeout = 4
"#;

fn write_config(contents: &str) -> (TempDir, std::path::PathBuf) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, contents).unwrap();
    (dir, path)
}

#[test]
fn test_missing_file_yields_defaults() {
    let dir = TempDir::new().unwrap();
    let cfg = load_config_from(&dir.path().join("absent.toml")).unwrap();

    assert_eq!(cfg.default_profile.as_deref(), Some("default"));
    assert_eq!(cfg.defaults.timeout, 30);
    assert!(cfg.defaults.fetch_state);
    assert!(cfg.profiles.is_empty());
}

#[test]
fn test_profiles_translate_to_client_config() {
    let (_dir, path) = write_config(SAMPLE);
    let cfg = load_config_from(&path).unwrap();

    let name = cfg.active_profile_name(None);
    assert_eq!(name, "home");
    let home = cfg.profile(name).unwrap();
    assert_eq!(home.catalog.as_deref(), Some(std::path::Path::new("/etc/vantage/home.json")));

    let client = profile_to_client_config(home, name, &cfg.defaults).unwrap();
    assert_eq!(client.host, "192.168.1.20");
    assert_eq!(client.port(), 3001);
    assert_eq!(client.tls, TlsVerification::Disabled);
    assert_eq!(client.request_timeout, Duration::from_secs(12));
    assert!(client.fetch_state);
    assert!(!client.monitor_state);
    assert!(client.auth.is_none());

    let office = cfg.profile("office").unwrap();
    let client = profile_to_client_config(office, "office", &cfg.defaults).unwrap();
    assert_eq!(client.port(), 3010);
    assert_eq!(client.tls, TlsVerification::DangerAcceptInvalid);
    assert_eq!(client.request_timeout, Duration::from_secs(4));
}

#[test]
fn test_empty_host_is_rejected() {
    let profile = Profile::default();
    let err = profile_to_client_config(&profile, "blank", &Config::default().defaults).unwrap_err();
    assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "host"));
}

#[test]
fn test_malformed_toml_is_reported() {
    let (_dir, path) = write_config("[profiles.home\nhost = 1");
    assert!(matches!(load_config_from(&path), Err(ConfigError::Figment(_))));
}

#[test]
fn test_saved_config_loads_back() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("config.toml");

    let mut cfg = Config::default();
    cfg.profiles.insert(
        "lab".into(),
        Profile {
            host: "10.0.0.9".into(),
            port: Some(4001),
            username: Some("installer".into()),
            password_env: Some("LAB_PASSWORD".into()),
            ..Profile::default()
        },
    );
    save_config_to(&cfg, &path).unwrap();

    let loaded = load_config_from(&path).unwrap();
    let lab = loaded.profile("lab").unwrap();
    assert_eq!(lab.port, Some(4001));
    assert_eq!(lab.username.as_deref(), Some("installer"));
    assert_eq!(lab.password_env.as_deref(), Some("LAB_PASSWORD"));
}
