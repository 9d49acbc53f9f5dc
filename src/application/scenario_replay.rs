//! Offline replay of recorded migration scenarios.
//!
//! Drives a [`ConvergenceVerifier`] through an [`InMemoryCoordinationService`]
//! exactly as a live coordination service would: batches are published to
//! whichever listeners are registered at that moment, so batches recorded
//! while the verifier is stopped reach nobody.
//!
//! Every anomaly is also published on the replay's [`AnomalyBus`]. Each
//! `reset` step opens a new correlation, so subscribers can tell migration
//! phases apart.

use std::sync::Arc;

use serde::Serialize;

use crate::adapters::memory::InMemoryCoordinationService;
use crate::domain::error::VerifierError;
use crate::domain::models::{AnomalyReport, Scenario, ScenarioStep, VerifierConfig, VerifierState};
use crate::services::{AnomalyBus, AnomalyBusConfig, ConvergenceVerifier, SequenceNumber};

/// Report captured at a `checkpoint` step.
#[derive(Debug, Clone, Serialize)]
pub struct Checkpoint {
    pub label: String,
    /// Anomalies published earlier in the same run.
    pub sequence: SequenceNumber,
    pub report: AnomalyReport,
}

/// Result of replaying a scenario.
#[derive(Debug, Clone, Serialize)]
pub struct ReplayOutcome {
    pub scenario: Option<String>,
    pub steps_applied: usize,
    /// Batches that reached at least one listener.
    pub batches_delivered: usize,
    /// Batches published while no listener was registered.
    pub batches_dropped: usize,
    /// Anomalies published over the whole run, resets included.
    pub anomalies_published: u64,
    pub checkpoints: Vec<Checkpoint>,
    pub final_state: VerifierState,
    pub report: AnomalyReport,
}

impl ReplayOutcome {
    /// True when the final report carries no anomaly flag.
    pub const fn is_clean(&self) -> bool {
        self.report.is_clean()
    }

    fn record_delivery(&mut self, notified: usize) {
        if notified == 0 {
            self.batches_dropped += 1;
        } else {
            self.batches_delivered += 1;
        }
    }
}

/// Replays scenarios against a fresh verifier per run.
pub struct ScenarioReplay {
    config: VerifierConfig,
    bus: Arc<AnomalyBus>,
}

impl ScenarioReplay {
    pub fn new(config: VerifierConfig) -> Self {
        let bus = Arc::new(AnomalyBus::new(&AnomalyBusConfig::from(&config)));
        Self { config, bus }
    }

    /// Bus carrying every anomaly raised during [`run`](Self::run).
    /// Subscribe before running to observe the stream.
    pub fn bus(&self) -> &Arc<AnomalyBus> {
        &self.bus
    }

    /// Replay every step of `scenario` and report what the verifier saw.
    ///
    /// Fails on a scenario that overrides the cluster to zero nodes, and on
    /// lifecycle misuse recorded in the scenario (for example two `start`
    /// steps without a `stop` between them).
    pub fn run(&self, scenario: &Scenario) -> Result<ReplayOutcome, VerifierError> {
        let mut config = self.config.clone();
        if let Some(nodes) = scenario.cluster_node_count {
            config.cluster_node_count = nodes;
        }
        if config.cluster_node_count == 0 {
            return Err(VerifierError::InvalidClusterNodeCount(config.cluster_node_count));
        }

        let coordination = Arc::new(InMemoryCoordinationService::new());
        let verifier =
            ConvergenceVerifier::builder(scenario.snapshot().into_shared(), coordination.clone())
                .config(&config)
                .sink(self.bus.clone())
                .build();

        tracing::info!(
            scenario = scenario.name.as_deref().unwrap_or("unnamed"),
            steps = scenario.steps.len(),
            resources = scenario.resources.len(),
            cluster_node_count = config.cluster_node_count,
            "Replaying migration scenario"
        );

        let first_sequence = self.bus.current_sequence();
        self.bus.start_correlation();
        let result = self.apply_steps(scenario, &verifier, &coordination, first_sequence);
        self.bus.end_correlation();
        let mut outcome = result?;

        verifier.stop();
        outcome.anomalies_published = self.bus.current_sequence().0 - first_sequence.0;
        outcome.final_state = verifier.state();
        outcome.report = verifier.report();
        Ok(outcome)
    }

    fn apply_steps(
        &self,
        scenario: &Scenario,
        verifier: &ConvergenceVerifier,
        coordination: &InMemoryCoordinationService,
        first_sequence: SequenceNumber,
    ) -> Result<ReplayOutcome, VerifierError> {
        if scenario.auto_start {
            verifier.start()?;
        }

        let mut outcome = ReplayOutcome {
            scenario: scenario.name.clone(),
            steps_applied: 0,
            batches_delivered: 0,
            batches_dropped: 0,
            anomalies_published: 0,
            checkpoints: Vec::new(),
            final_state: VerifierState::Stopped,
            report: verifier.report(),
        };

        for (index, step) in scenario.steps.iter().enumerate() {
            tracing::debug!(step = index, ?step, "Applying scenario step");
            match step {
                ScenarioStep::Declared { placements } => {
                    outcome.record_delivery(coordination.publish_declared(placements));
                }
                ScenarioStep::Actual { placements } => {
                    outcome.record_delivery(coordination.publish_actual(placements));
                }
                ScenarioStep::Start => verifier.start()?,
                ScenarioStep::Stop => verifier.stop(),
                ScenarioStep::Reset => {
                    verifier.reset();
                    let phase = self.bus.start_correlation();
                    tracing::debug!(%phase, "Started new migration phase");
                }
                ScenarioStep::Checkpoint { label } => outcome.checkpoints.push(Checkpoint {
                    label: label.clone(),
                    sequence: SequenceNumber(self.bus.current_sequence().0 - first_sequence.0),
                    report: verifier.report(),
                }),
            }
            outcome.steps_applied += 1;
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario(yaml: &str) -> Scenario {
        serde_yaml::from_str(yaml).expect("scenario should parse")
    }

    const BASE: &str = r"
name: shrink replicas
cluster_node_count: 6
resources:
  - resource: Test-DB-0
    replicas: 3
    partitions:
      Test-DB-0_0: { n1: MASTER, n2: SLAVE, n3: SLAVE }
";

    #[test]
    fn test_replay_flags_under_replication_and_checkpoints() {
        let yaml = format!(
            "{BASE}steps:
  - action: actual
    placements:
      - resource: Test-DB-0
        partitions:
          Test-DB-0_0: {{ n1: MASTER, n2: SLAVE }}
  - action: checkpoint
    label: during-move
  - action: reset
  - action: checkpoint
    label: after-reset
"
        );
        let outcome = ScenarioReplay::new(VerifierConfig::default())
            .run(&scenario(&yaml))
            .unwrap();

        assert_eq!(outcome.steps_applied, 4);
        assert_eq!(outcome.batches_delivered, 1);
        assert!(outcome.checkpoints[0].report.has_under_replication);
        assert!(outcome.checkpoints[1].report.is_clean());
        assert!(outcome.is_clean());
        assert_eq!(outcome.final_state, VerifierState::Stopped);
    }

    #[test]
    fn test_batches_after_stop_are_dropped() {
        let yaml = format!(
            "{BASE}steps:
  - action: stop
  - action: actual
    placements:
      - resource: Test-DB-0
        partitions: {{}}
"
        );
        let outcome = ScenarioReplay::new(VerifierConfig::default())
            .run(&scenario(&yaml))
            .unwrap();

        assert_eq!(outcome.batches_dropped, 1);
        assert!(outcome.is_clean());
    }

    #[test]
    fn test_double_start_is_reported() {
        let yaml = format!("{BASE}steps:\n  - action: start\n");
        let err = ScenarioReplay::new(VerifierConfig::default())
            .run(&scenario(&yaml))
            .unwrap_err();
        assert_eq!(err, VerifierError::AlreadyTracking);
    }

    #[test]
    fn test_reset_opens_new_correlation() {
        let yaml = format!(
            "{BASE}steps:
  - action: actual
    placements:
      - resource: Test-DB-0
        partitions:
          Test-DB-0_0: {{ n1: MASTER }}
  - action: reset
  - action: actual
    placements:
      - resource: Test-DB-0
        partitions:
          Test-DB-0_0: {{ n1: MASTER, n2: SLAVE }}
"
        );
        let replay = ScenarioReplay::new(VerifierConfig::default());
        let mut events = replay.bus().subscribe();

        let outcome = replay.run(&scenario(&yaml)).unwrap();
        assert_eq!(outcome.anomalies_published, 2);
        assert!(outcome.report.has_under_replication);

        let first = events.try_recv().unwrap();
        let second = events.try_recv().unwrap();
        assert_eq!(first.sequence, SequenceNumber(0));
        assert_eq!(second.sequence, SequenceNumber(1));
        assert!(first.correlation_id.is_some());
        assert!(second.correlation_id.is_some());
        assert_ne!(first.correlation_id, second.correlation_id);
    }

    #[test]
    fn test_zero_node_override_is_rejected() {
        let yaml = BASE.replace("cluster_node_count: 6", "cluster_node_count: 0")
            + "steps:
  - action: actual
    placements:
      - resource: Test-DB-0
        partitions:
          Test-DB-0_0: { n1: MASTER }
";
        let replay = ScenarioReplay::new(VerifierConfig::default());

        let err = replay.run(&scenario(&yaml)).unwrap_err();
        assert_eq!(err, VerifierError::InvalidClusterNodeCount(0));
        assert_eq!(replay.bus().current_sequence(), SequenceNumber(0));
    }

    #[test]
    fn test_checkpoint_sequence_is_relative_to_run() {
        let yaml = format!(
            "{BASE}steps:
  - action: actual
    placements:
      - resource: Test-DB-0
        partitions:
          Test-DB-0_0: {{ n1: MASTER }}
  - action: checkpoint
    label: after-loss
"
        );
        let scenario = scenario(&yaml);
        let replay = ScenarioReplay::new(VerifierConfig::default());

        let first = replay.run(&scenario).unwrap();
        let second = replay.run(&scenario).unwrap();

        assert_eq!(first.checkpoints[0].sequence, SequenceNumber(1));
        assert_eq!(second.checkpoints[0].sequence, SequenceNumber(1));
        assert_eq!(second.anomalies_published, 1);
        assert_eq!(replay.bus().current_sequence(), SequenceNumber(2));
    }
}
