//! Placement Verifier - replica convergence checks for cluster migrations
//!
//! While a distributed store migrates partitions between nodes, a coordination
//! service streams two views of placement: the declared placement (what the
//! controller wants) and the actual placement (what the nodes report). The
//! verifier subscribes to both and flags any partition whose replica count
//! falls outside `[expected, expected + tolerance]`.
//!
//! # Architecture
//!
//! - **Domain Layer** (`domain`): placement models, anomaly records and ports
//! - **Service Layer** (`services`): replica policy, the verifier and its sinks
//! - **Adapters** (`adapters`): an in-memory coordination service
//! - **Application Layer** (`application`): offline scenario replay
//! - **Infrastructure Layer** (`infrastructure`): configuration and logging
//! - **CLI Layer** (`cli`): command-line interface
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use placement_verifier::{ConvergenceVerifier, DeclaredPlacementSnapshot, InMemoryCoordinationService};
//!
//! let coordination = Arc::new(InMemoryCoordinationService::new());
//! let verifier = ConvergenceVerifier::builder(snapshot.into_shared(), coordination.clone())
//!     .cluster_node_count(6)
//!     .build();
//! verifier.start()?;
//! // ... migrate ...
//! verifier.stop();
//! assert!(!verifier.has_less_replica());
//! ```

pub mod adapters;
pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use adapters::memory::InMemoryCoordinationService;
pub use application::{ReplayOutcome, ScenarioReplay};
pub use domain::models::{
    ActualPlacement, AnomalyKind, AnomalyRecord, AnomalyReport, Config, DeclaredPlacement,
    DeclaredPlacementSnapshot, PlacementStream, ReplicaFactor, Scenario, VerifierConfig,
    VerifierState,
};
pub use domain::ports::{CoordinationService, DiagnosticSink, ListenerId, PlacementChangeListener};
pub use domain::{CoordinationError, VerifierError};
pub use infrastructure::config::ConfigLoader;
pub use infrastructure::logging::{LogConfig, LoggerImpl};
pub use services::{
    AnomalyBus, ConvergenceVerifier, ReplicaBounds, ReplicaCountPolicy, VerifierBuilder,
    DEFAULT_TOLERANCE,
};
