//! Anomaly records and the report exposed to the driving harness.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Which change stream a placement record arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlacementStream {
    /// Target placement the controller intends.
    Declared,
    /// Placement currently reported by cluster members.
    Actual,
}

impl PlacementStream {
    /// Both streams, in registration order.
    pub const ALL: [Self; 2] = [Self::Declared, Self::Actual];
}

impl fmt::Display for PlacementStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Declared => write!(f, "declared"),
            Self::Actual => write!(f, "actual"),
        }
    }
}

/// Kind of replica-count violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    /// Fewer replicas than expected.
    UnderReplicated,
    /// More replicas than expected plus tolerance.
    OverReplicated,
}

impl fmt::Display for AnomalyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnderReplicated => write!(f, "under_replicated"),
            Self::OverReplicated => write!(f, "over_replicated"),
        }
    }
}

/// Diagnostic record emitted for every out-of-bounds partition observation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnomalyRecord {
    pub id: Uuid,
    pub kind: AnomalyKind,
    pub stream: PlacementStream,
    pub resource: String,
    pub partition: String,
    /// Replicas present in the observed state map.
    pub observed: usize,
    /// Expected replica count (lower bound, inclusive).
    pub expected: usize,
    /// Largest acceptable replica count (upper bound, inclusive).
    pub upper_bound: usize,
    pub observed_at: DateTime<Utc>,
}

impl AnomalyRecord {
    /// Create a record stamped with the current time.
    pub fn new(
        kind: AnomalyKind,
        stream: PlacementStream,
        resource: impl Into<String>,
        partition: impl Into<String>,
        observed: usize,
        expected: usize,
        upper_bound: usize,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            stream,
            resource: resource.into(),
            partition: partition.into(),
            observed,
            expected,
            upper_bound,
            observed_at: Utc::now(),
        }
    }
}

impl fmt::Display for AnomalyRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "resource {}, partition {} has {} replicas in {} (expected {}..={})",
            self.resource, self.partition, self.observed, self.stream, self.expected, self.upper_bound
        )
    }
}

/// Anomaly counts for one stream since the last reset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamTally {
    pub under_replicated: u64,
    pub over_replicated: u64,
}

impl StreamTally {
    /// Total anomalies on this stream.
    pub const fn total(&self) -> u64 {
        self.under_replicated + self.over_replicated
    }
}

/// Point-in-time summary of everything the verifier observed since the last reset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnomalyReport {
    pub has_under_replication: bool,
    pub has_over_replication: bool,
    pub declared: StreamTally,
    pub actual: StreamTally,
    /// Most recent anomaly records, oldest first.
    pub recent: Vec<AnomalyRecord>,
    pub generated_at: DateTime<Utc>,
}

impl AnomalyReport {
    /// True when neither flag is set.
    pub const fn is_clean(&self) -> bool {
        !self.has_under_replication && !self.has_over_replication
    }

    /// Anomalies observed across both streams.
    pub const fn total_anomalies(&self) -> u64 {
        self.declared.total() + self.actual.total()
    }

    /// Tally for a given stream.
    pub const fn tally(&self, stream: PlacementStream) -> StreamTally {
        match stream {
            PlacementStream::Declared => self.declared,
            PlacementStream::Actual => self.actual,
        }
    }
}
