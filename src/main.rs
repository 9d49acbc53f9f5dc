//! Placement verifier CLI entry point.

use std::process::ExitCode;

use clap::Parser;

use placement_verifier::cli::commands::{self, check_config, replay};
use placement_verifier::cli::{handle_error, Cli, Commands};
use placement_verifier::infrastructure::logging::{LogConfig, LoggerImpl};

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config_path = match &cli.command {
        Commands::Replay(args) => args.config.clone(),
        Commands::CheckConfig(args) => args.config.clone(),
    };

    let config = match commands::load_config(config_path.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            handle_error(&err, cli.json);
            return ExitCode::from(2);
        }
    };

    let _logger = match LoggerImpl::init(&LogConfig::from(&config.logging)) {
        Ok(logger) => Some(logger),
        Err(err) => {
            eprintln!("Warning: logging disabled: {err:#}");
            None
        }
    };

    let result = match cli.command {
        Commands::Replay(args) => replay::execute(args, config, cli.json),
        Commands::CheckConfig(args) => check_config::execute(args, config, cli.json).map(|()| true),
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            handle_error(&err, cli.json);
            ExitCode::from(2)
        }
    }
}
