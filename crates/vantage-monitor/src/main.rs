//! `vantage-monitor`: print the state of every known object on a Vantage
//! InFusion controller, then follow changes until interrupted.
//!
//! Connection settings come from a `vantage-config` profile, optionally
//! overridden by flags. The object catalog is a JSON file of
//! `{"id", "type", "name"}` entries exported from discovery.

mod cli;
mod output;

use std::path::Path;

use clap::Parser;
use color_eyre::eyre::{Result, WrapErr, eyre};
use secrecy::SecretString;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use vantage_core::{AuthCredentials, ClientConfig, ObjectInfo, Vantage};

use crate::cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    run(cli).await
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let (mut config, profile_catalog) = build_client_config(&cli)?;
    if cli.no_fetch {
        config.fetch_state = false;
    }
    if cli.once {
        config.monitor_state = false;
    }

    let catalog_path = cli
        .catalog
        .or(profile_catalog)
        .ok_or_else(|| eyre!("no object catalog: pass --catalog or set `catalog` in the profile"))?;
    let catalog = read_catalog(&catalog_path)?;

    let vantage = Vantage::new(config)?;
    let summary = vantage.load_catalog(catalog)?;
    info!(
        added = summary.added,
        ignored = summary.ignored,
        "catalog loaded"
    );

    vantage.initialize().await?;
    for object in vantage.registry().objects() {
        println!("{}", output::object_line(&object));
    }

    if vantage.config().monitor_state {
        let subscription = vantage.subscribe(|event| {
            println!("{}", output::event_line(event, chrono::Local::now()));
        });
        tokio::signal::ctrl_c()
            .await
            .wrap_err("failed to listen for ctrl-c")?;
        debug!("interrupted, shutting down");
        let _ = subscription.unsubscribe();
    }

    vantage.close().await;
    Ok(())
}

/// Build a `ClientConfig` from the config file, profile and CLI overrides.
/// Also returns the profile's catalog path, if any.
fn build_client_config(cli: &Cli) -> Result<(ClientConfig, Option<std::path::PathBuf>)> {
    let cfg = vantage_config::load_config_or_default();
    let profile_name = cfg.active_profile_name(cli.profile.as_deref());

    let (mut config, catalog) = match cfg.profiles.get(profile_name) {
        Some(profile) => (
            vantage_config::profile_to_client_config(profile, profile_name, &cfg.defaults)?,
            profile.catalog.clone(),
        ),
        None => {
            // No profile: flags alone must name the controller.
            let host = cli.host.as_deref().ok_or_else(|| {
                eyre!(
                    "profile '{profile_name}' not found in {} and no --host given",
                    vantage_config::config_path().display()
                )
            })?;
            (ClientConfig::new(host), None)
        }
    };

    if let Some(ref host) = cli.host {
        config.host.clone_from(host);
    }
    if cli.port.is_some() {
        config.port = cli.port;
    }
    if let Some(ref username) = cli.username {
        let password = cli
            .password
            .clone()
            .ok_or_else(|| eyre!("--username requires a password (--password or VANTAGE_PASSWORD)"))?;
        config.auth = Some(AuthCredentials {
            username: username.clone(),
            password: SecretString::from(password),
        });
    }

    Ok((config, catalog))
}

fn read_catalog(path: &Path) -> Result<Vec<ObjectInfo>> {
    let json = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("failed to read catalog {}", path.display()))?;
    let catalog = vantage_core::parse_catalog(&json)
        .wrap_err_with(|| format!("invalid catalog {}", path.display()))?;
    Ok(catalog)
}
