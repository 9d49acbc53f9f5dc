//! Service layer: the replica count policy, the convergence verifier and the
//! diagnostic plumbing around it.

pub mod anomaly_bus;
pub mod anomaly_ledger;
pub mod convergence_verifier;
pub mod diagnostics;
pub mod listener_registration;
pub mod replica_policy;

pub use anomaly_bus::{AnomalyBus, AnomalyBusConfig, AnomalyEvent, SequenceNumber};
pub use anomaly_ledger::AnomalyLedger;
pub use convergence_verifier::{ConvergenceVerifier, VerifierBuilder};
pub use diagnostics::TracingDiagnosticSink;
pub use listener_registration::ListenerRegistration;
pub use replica_policy::{ReplicaBounds, ReplicaCountPolicy, DEFAULT_TOLERANCE};
