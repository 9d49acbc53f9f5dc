//! Implementation of the `placement-verifier replay` command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use crate::application::{ReplayOutcome, ScenarioReplay};
use crate::cli::output::{output, CommandOutput, ReportTable};
use crate::domain::models::{Config, Scenario};

#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// Scenario file (YAML)
    pub scenario: PathBuf,

    /// Configuration file (defaults to .placement-verifier/config.yaml)
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Disable colored table output
    #[arg(long)]
    pub no_color: bool,
}

#[derive(Debug, Serialize)]
pub struct ReplayOutput {
    pub success: bool,
    pub outcome: ReplayOutcome,
    #[serde(skip)]
    use_colors: bool,
}

impl CommandOutput for ReplayOutput {
    fn to_human(&self) -> String {
        let outcome = &self.outcome;
        let table = ReportTable::new(self.use_colors);
        let mut lines = vec![format!(
            "Scenario: {}",
            outcome.scenario.as_deref().unwrap_or("unnamed")
        )];
        lines.push(format!(
            "Steps applied: {}, batches delivered: {}, dropped: {}, anomalies published: {}",
            outcome.steps_applied,
            outcome.batches_delivered,
            outcome.batches_dropped,
            outcome.anomalies_published
        ));

        for checkpoint in &outcome.checkpoints {
            lines.push(format!("\nCheckpoint '{}':", checkpoint.label));
            lines.push(table.format_summary(&checkpoint.report));
        }

        lines.push("\nFinal report:".to_string());
        lines.push(table.format_summary(&outcome.report));
        if !outcome.report.recent.is_empty() {
            lines.push("\nRecent anomalies:".to_string());
            lines.push(table.format_recent(&outcome.report));
        }

        lines.push(if self.success {
            "\nReplicas converged within bounds".to_string()
        } else {
            format!(
                "\nReplica anomalies detected ({} total)",
                outcome.report.total_anomalies()
            )
        });
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Replay the scenario and print the outcome.
///
/// Returns `Ok(false)` when the final report carries an anomaly flag.
pub fn execute(args: ReplayArgs, config: Config, json_mode: bool) -> Result<bool> {
    let raw = std::fs::read_to_string(&args.scenario)
        .with_context(|| format!("Failed to read scenario {}", args.scenario.display()))?;
    let scenario: Scenario = serde_yaml::from_str(&raw)
        .with_context(|| format!("Failed to parse scenario {}", args.scenario.display()))?;

    let outcome = ScenarioReplay::new(config.verifier)
        .run(&scenario)
        .context("Scenario replay failed")?;
    let success = outcome.is_clean();

    output(
        &ReplayOutput {
            success,
            outcome,
            use_colors: !args.no_color,
        },
        json_mode,
    );
    Ok(success)
}
