//! Command-line interface for replaying migration scenarios.

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};

use commands::check_config::CheckConfigArgs;
use commands::replay::ReplayArgs;

#[derive(Parser, Debug)]
#[command(name = "placement-verifier")]
#[command(about = "Replica convergence verifier for cluster migrations", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as JSON
    #[arg(short, long, global = true)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Replay a recorded migration scenario and report replica anomalies
    Replay(ReplayArgs),
    /// Print the effective configuration
    CheckConfig(CheckConfigArgs),
}

/// Print an error the way the selected output mode expects.
pub fn handle_error(err: &anyhow::Error, json_mode: bool) {
    if json_mode {
        let value = serde_json::json!({
            "success": false,
            "error": format!("{err:#}"),
        });
        eprintln!("{}", serde_json::to_string_pretty(&value).unwrap_or_default());
    } else {
        eprintln!("Error: {err:#}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_replay_with_global_json() {
        let cli = Cli::parse_from(["placement-verifier", "replay", "scenario.yaml", "--json"]);
        assert!(cli.json);
        match cli.command {
            Commands::Replay(args) => {
                assert_eq!(args.scenario.to_str(), Some("scenario.yaml"));
                assert!(args.config.is_none());
            }
            Commands::CheckConfig(_) => panic!("expected replay"),
        }
    }

    #[test]
    fn test_parse_check_config_with_file() {
        let cli = Cli::parse_from(["placement-verifier", "check-config", "--config", "custom.yaml"]);
        assert!(!cli.json);
        assert!(matches!(cli.command, Commands::CheckConfig(args) if args.config.is_some()));
    }
}
