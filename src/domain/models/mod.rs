pub mod anomaly;
pub mod config;
pub mod lifecycle;
pub mod placement;
pub mod scenario;

pub use anomaly::{AnomalyKind, AnomalyRecord, AnomalyReport, PlacementStream, StreamTally};
pub use config::{Config, LoggingConfig, VerifierConfig};
pub use lifecycle::VerifierState;
pub use placement::{
    ActualPlacement, DeclaredPlacement, DeclaredPlacementSnapshot, ReplicaFactor, StateMap,
    ANY_LIVE_INSTANCE,
};
pub use scenario::{Scenario, ScenarioStep};
