//! Placement records delivered by the coordination service.
//!
//! Both streams share the same shape: a resource name plus a map from
//! partition name to a state map (node id -> replica state name). Declared
//! records additionally carry the resource's replica factor, which the
//! replica count policy turns into an expected count.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Replica assignment for one partition: node id -> replica state name.
pub type StateMap = BTreeMap<String, String>;

/// Marker the coordination service uses for "one replica per live node".
pub const ANY_LIVE_INSTANCE: &str = "ANY_LIVEINSTANCE";

/// Configured number of copies a resource's partitions should maintain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "ReplicaFactorRepr", into = "String")]
pub enum ReplicaFactor {
    /// A fixed number of replicas.
    Fixed(u32),
    /// One replica on every live node.
    AnyLiveInstance,
    /// Missing or unparsable; the policy falls back to the cluster size.
    #[default]
    Unspecified,
}

impl FromStr for ReplicaFactor {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case(ANY_LIVE_INSTANCE) {
            return Ok(Self::AnyLiveInstance);
        }
        Ok(trimmed
            .parse::<u32>()
            .map_or(Self::Unspecified, Self::Fixed))
    }
}

impl fmt::Display for ReplicaFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(n) => write!(f, "{n}"),
            Self::AnyLiveInstance => f.write_str(ANY_LIVE_INSTANCE),
            Self::Unspecified => f.write_str(""),
        }
    }
}

impl From<ReplicaFactor> for String {
    fn from(factor: ReplicaFactor) -> Self {
        factor.to_string()
    }
}

/// Accepts both `replicas: 3` and `replicas: "ANY_LIVEINSTANCE"`.
#[derive(Deserialize)]
#[serde(untagged)]
enum ReplicaFactorRepr {
    Count(u32),
    Text(String),
}

impl From<ReplicaFactorRepr> for ReplicaFactor {
    fn from(repr: ReplicaFactorRepr) -> Self {
        match repr {
            ReplicaFactorRepr::Count(n) => Self::Fixed(n),
            ReplicaFactorRepr::Text(text) => match text.parse() {
                Ok(factor) => factor,
                Err(never) => match never {},
            },
        }
    }
}

/// Target replica assignment of one resource, as declared by the controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclaredPlacement {
    /// Resource name.
    pub resource: String,
    /// Configured replica factor for every partition of the resource.
    #[serde(default, rename = "replicas")]
    pub replica_factor: ReplicaFactor,
    /// Partition name -> declared state map.
    #[serde(default)]
    pub partitions: BTreeMap<String, StateMap>,
}

impl DeclaredPlacement {
    /// Create a declared placement with no partitions.
    pub fn new(resource: impl Into<String>, replica_factor: ReplicaFactor) -> Self {
        Self {
            resource: resource.into(),
            replica_factor,
            partitions: BTreeMap::new(),
        }
    }

    /// Add (or replace) a partition's declared assignment.
    #[must_use]
    pub fn with_partition<I, N, S>(mut self, partition: impl Into<String>, assignment: I) -> Self
    where
        I: IntoIterator<Item = (N, S)>,
        N: Into<String>,
        S: Into<String>,
    {
        self.partitions
            .insert(partition.into(), collect_state_map(assignment));
        self
    }

    /// Declared partition names, in sorted order.
    pub fn partition_names(&self) -> impl Iterator<Item = &str> {
        self.partitions.keys().map(String::as_str)
    }

    /// Declared assignment of a single partition.
    pub fn state_map(&self, partition: &str) -> Option<&StateMap> {
        self.partitions.get(partition)
    }
}

/// Replica assignment of one resource as currently reported by cluster members.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActualPlacement {
    /// Resource name.
    pub resource: String,
    /// Partition name -> reported state map.
    #[serde(default)]
    pub partitions: BTreeMap<String, StateMap>,
}

impl ActualPlacement {
    /// Create an actual placement with no partitions reported.
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            partitions: BTreeMap::new(),
        }
    }

    /// Add (or replace) a partition's reported assignment.
    #[must_use]
    pub fn with_partition<I, N, S>(mut self, partition: impl Into<String>, assignment: I) -> Self
    where
        I: IntoIterator<Item = (N, S)>,
        N: Into<String>,
        S: Into<String>,
    {
        self.partitions
            .insert(partition.into(), collect_state_map(assignment));
        self
    }

    /// Number of replicas reported for a partition. Unreported partitions have zero.
    pub fn replica_count(&self, partition: &str) -> usize {
        self.partitions.get(partition).map_or(0, BTreeMap::len)
    }
}

fn collect_state_map<I, N, S>(assignment: I) -> StateMap
where
    I: IntoIterator<Item = (N, S)>,
    N: Into<String>,
    S: Into<String>,
{
    assignment
        .into_iter()
        .map(|(node, state)| (node.into(), state.into()))
        .collect()
}

/// Declared placement of every tracked resource, captured once when a
/// migration scenario begins. Immutable after construction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeclaredPlacementSnapshot {
    resources: HashMap<String, DeclaredPlacement>,
}

impl DeclaredPlacementSnapshot {
    /// Build a snapshot. A later placement for the same resource replaces an earlier one.
    pub fn new(placements: impl IntoIterator<Item = DeclaredPlacement>) -> Self {
        placements.into_iter().collect()
    }

    /// Wrap the snapshot for read-only sharing with a verifier.
    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Look up a tracked resource.
    pub fn get(&self, resource: &str) -> Option<&DeclaredPlacement> {
        self.resources.get(resource)
    }

    /// Whether the resource is tracked.
    pub fn contains(&self, resource: &str) -> bool {
        self.resources.contains_key(resource)
    }

    /// Tracked resource names, sorted.
    pub fn resource_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.resources.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of tracked resources.
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Whether no resource is tracked.
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Total declared partitions across all tracked resources.
    pub fn partition_count(&self) -> usize {
        self.resources.values().map(|p| p.partitions.len()).sum()
    }
}

impl FromIterator<DeclaredPlacement> for DeclaredPlacementSnapshot {
    fn from_iter<T: IntoIterator<Item = DeclaredPlacement>>(iter: T) -> Self {
        Self {
            resources: iter
                .into_iter()
                .map(|placement| (placement.resource.clone(), placement))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replica_factor_parsing() {
        assert_eq!("3".parse::<ReplicaFactor>().unwrap(), ReplicaFactor::Fixed(3));
        assert_eq!(
            "ANY_LIVEINSTANCE".parse::<ReplicaFactor>().unwrap(),
            ReplicaFactor::AnyLiveInstance
        );
        assert_eq!(
            "any_liveinstance".parse::<ReplicaFactor>().unwrap(),
            ReplicaFactor::AnyLiveInstance
        );
        assert_eq!("three".parse::<ReplicaFactor>().unwrap(), ReplicaFactor::Unspecified);
        assert_eq!("".parse::<ReplicaFactor>().unwrap(), ReplicaFactor::Unspecified);
    }

    #[test]
    fn test_declared_placement_yaml() {
        let yaml = r#"
resource: Test-DB-0
replicas: 3
partitions:
  Test-DB-0_0:
    node_12918: MASTER
    node_12919: SLAVE
  Test-DB-0_1: {}
"#;
        let placement: DeclaredPlacement = serde_yaml::from_str(yaml).expect("YAML should parse");
        assert_eq!(placement.replica_factor, ReplicaFactor::Fixed(3));
        assert_eq!(placement.partitions.len(), 2);
        assert_eq!(placement.state_map("Test-DB-0_0").map(BTreeMap::len), Some(2));

        let any: DeclaredPlacement =
            serde_yaml::from_str("resource: r\nreplicas: ANY_LIVEINSTANCE\n").unwrap();
        assert_eq!(any.replica_factor, ReplicaFactor::AnyLiveInstance);

        let unset: DeclaredPlacement = serde_yaml::from_str("resource: r\n").unwrap();
        assert_eq!(unset.replica_factor, ReplicaFactor::Unspecified);
    }

    #[test]
    fn test_actual_replica_count_defaults_to_zero() {
        let actual = ActualPlacement::new("db").with_partition("db_0", [("n1", "ONLINE")]);
        assert_eq!(actual.replica_count("db_0"), 1);
        assert_eq!(actual.replica_count("db_1"), 0);
    }

    #[test]
    fn test_snapshot_lookup() {
        let snapshot = DeclaredPlacementSnapshot::new([
            DeclaredPlacement::new("b", ReplicaFactor::Fixed(3)).with_partition("b_0", [("n1", "ONLINE")]),
            DeclaredPlacement::new("a", ReplicaFactor::Fixed(2)),
        ]);
        assert_eq!(snapshot.len(), 2);
        assert!(snapshot.contains("a"));
        assert!(!snapshot.contains("c"));
        assert_eq!(snapshot.resource_names(), vec!["a", "b"]);
        assert_eq!(snapshot.partition_count(), 1);
    }
}
