//! Replica count policy.
//!
//! Derives the expected replica count of a resource from the cluster size and
//! its replica factor, and classifies an observed count against the band
//! `[expected, expected + tolerance]`. Under-replication has no tolerance; a
//! rebalance may transiently add replicas before retiring old copies, but it
//! must never drop below the steady-state count.

use crate::domain::models::{AnomalyKind, ReplicaFactor};

/// Extra replicas tolerated above the expected count.
pub const DEFAULT_TOLERANCE: usize = 10;

/// Inclusive replica-count bounds for one resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplicaBounds {
    pub expected: usize,
    pub upper: usize,
}

impl ReplicaBounds {
    /// Classify an observed replica count.
    pub const fn classify(&self, observed: usize) -> Option<AnomalyKind> {
        if observed < self.expected {
            Some(AnomalyKind::UnderReplicated)
        } else if observed > self.upper {
            Some(AnomalyKind::OverReplicated)
        } else {
            None
        }
    }

    pub const fn contains(&self, observed: usize) -> bool {
        self.classify(observed).is_none()
    }
}

/// Pure replica count policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplicaCountPolicy {
    tolerance: usize,
}

impl Default for ReplicaCountPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_TOLERANCE)
    }
}

impl ReplicaCountPolicy {
    pub const fn new(tolerance: usize) -> Self {
        Self { tolerance }
    }

    pub const fn tolerance(&self) -> usize {
        self.tolerance
    }

    /// Expected replicas for a resource: its replica factor capped at the
    /// cluster size. Always at least 1.
    pub fn expected_replicas(&self, factor: ReplicaFactor, cluster_node_count: usize) -> usize {
        let expected = match factor {
            ReplicaFactor::Fixed(n) => (n as usize).min(cluster_node_count),
            ReplicaFactor::AnyLiveInstance | ReplicaFactor::Unspecified => cluster_node_count,
        };
        expected.max(1)
    }

    /// Largest acceptable replica count for a given expected count.
    pub const fn upper_bound(&self, expected: usize) -> usize {
        expected.saturating_add(self.tolerance)
    }

    pub fn bounds(&self, factor: ReplicaFactor, cluster_node_count: usize) -> ReplicaBounds {
        let expected = self.expected_replicas(factor, cluster_node_count);
        ReplicaBounds {
            expected,
            upper: self.upper_bound(expected),
        }
    }
}
