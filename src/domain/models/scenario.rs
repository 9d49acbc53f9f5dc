//! Recorded migration scenarios for offline replay.
//!
//! A scenario is the declared snapshot plus the ordered sequence of change
//! batches and lifecycle actions a harness observed during a migration.

use serde::{Deserialize, Serialize};

use super::placement::{ActualPlacement, DeclaredPlacement, DeclaredPlacementSnapshot};

/// A recorded migration scenario.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    /// Human-readable scenario name.
    #[serde(default)]
    pub name: Option<String>,

    /// Overrides the configured cluster node count when set.
    #[serde(default)]
    pub cluster_node_count: Option<usize>,

    /// Declared placement captured at scenario start.
    #[serde(default)]
    pub resources: Vec<DeclaredPlacement>,

    /// Steps replayed in order.
    #[serde(default)]
    pub steps: Vec<ScenarioStep>,

    /// Start tracking before the first step (the usual harness flow).
    #[serde(default = "default_auto_start")]
    pub auto_start: bool,
}

const fn default_auto_start() -> bool {
    true
}

impl Scenario {
    /// Build the declared snapshot from the scenario's resources.
    pub fn snapshot(&self) -> DeclaredPlacementSnapshot {
        self.resources.iter().cloned().collect()
    }
}

/// One replayed step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ScenarioStep {
    /// Deliver a declared-placement batch.
    Declared { placements: Vec<DeclaredPlacement> },
    /// Deliver an actual-placement batch.
    Actual { placements: Vec<ActualPlacement> },
    /// Begin tracking.
    Start,
    /// Stop tracking.
    Stop,
    /// Clear anomaly flags, typically between migration phases.
    Reset,
    /// Capture the current report under a label.
    Checkpoint { label: String },
}
