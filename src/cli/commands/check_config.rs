//! Implementation of the `placement-verifier check-config` command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use crate::cli::output::{output, CommandOutput};
use crate::domain::models::Config;

#[derive(Args, Debug)]
pub struct CheckConfigArgs {
    /// Configuration file (defaults to .placement-verifier/config.yaml)
    #[arg(long, short)]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
pub struct CheckConfigOutput {
    pub source: String,
    pub config: Config,
    #[serde(skip)]
    rendered: String,
}

impl CommandOutput for CheckConfigOutput {
    fn to_human(&self) -> String {
        format!("# effective configuration ({})\n{}", self.source, self.rendered)
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub fn execute(args: CheckConfigArgs, config: Config, json_mode: bool) -> Result<()> {
    let source = args.config.as_ref().map_or_else(
        || "project defaults and environment".to_string(),
        |path| path.display().to_string(),
    );
    let rendered = serde_yaml::to_string(&config).context("Failed to render configuration")?;

    output(
        &CheckConfigOutput {
            source,
            config,
            rendered,
        },
        json_mode,
    );
    Ok(())
}
