use std::path::PathBuf;

use clap::Parser;

/// Watch a Vantage InFusion controller and print object state changes.
#[derive(Parser, Debug)]
#[command(name = "vantage-monitor", version, about)]
pub struct Cli {
    /// Profile from the config file (defaults to `default_profile`)
    #[arg(short, long, env = "VANTAGE_PROFILE")]
    pub profile: Option<String>,

    /// Controller host; bypasses the config file when no profile matches
    #[arg(long, env = "VANTAGE_HOST")]
    pub host: Option<String>,

    /// Host-command port (3001 plain, 3010 TLS)
    #[arg(long)]
    pub port: Option<u16>,

    /// Login user
    #[arg(short, long, env = "VANTAGE_USERNAME")]
    pub username: Option<String>,

    /// Login password
    #[arg(long, env = "VANTAGE_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// JSON object catalog; overrides the profile's `catalog`
    #[arg(short, long)]
    pub catalog: Option<PathBuf>,

    /// Skip the initial state query
    #[arg(long)]
    pub no_fetch: bool,

    /// Print the snapshot and exit instead of following changes
    #[arg(long)]
    pub once: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn verbosity_counts_flags() {
        let cli = Cli::try_parse_from(["vantage-monitor", "-vv", "--once", "--catalog", "c.json"])
            .unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(cli.verbose, 2);
        assert!(cli.once);
        assert_eq!(cli.catalog, Some(PathBuf::from("c.json")));
    }
}
