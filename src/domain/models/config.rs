use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure for the placement verifier
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Verifier tuning
    #[serde(default)]
    pub verifier: VerifierConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Verifier configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct VerifierConfig {
    /// Number of nodes in the cluster under observation
    #[serde(default = "default_cluster_node_count")]
    pub cluster_node_count: usize,

    /// Extra replicas tolerated above the expected count during migration
    #[serde(default = "default_tolerance")]
    pub tolerance: usize,

    /// Number of recent anomaly records kept for the report
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,

    /// Capacity of the anomaly broadcast channel
    #[serde(default = "default_anomaly_channel_capacity")]
    pub anomaly_channel_capacity: usize,
}

const fn default_cluster_node_count() -> usize {
    6
}

const fn default_tolerance() -> usize {
    10
}

const fn default_history_capacity() -> usize {
    256
}

const fn default_anomaly_channel_capacity() -> usize {
    1024
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            cluster_node_count: default_cluster_node_count(),
            tolerance: default_tolerance(),
            history_capacity: default_history_capacity(),
            anomaly_channel_capacity: default_anomaly_channel_capacity(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling log files; stderr only when unset
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// File rotation: daily, hourly or never
    #[serde(default = "default_rotation")]
    pub rotation: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_rotation() -> String {
    "daily".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            rotation: default_rotation(),
        }
    }
}
