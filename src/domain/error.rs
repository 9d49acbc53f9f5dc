use thiserror::Error;

use super::ports::ListenerId;

/// Errors reported by a coordination service port
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoordinationError {
    #[error("Listener registration rejected: {0}")]
    RegistrationRejected(String),

    #[error("Listener not registered: {0}")]
    UnknownListener(ListenerId),

    #[error("Coordination service unavailable: {0}")]
    Unavailable(String),
}

/// Errors reported to callers of the convergence verifier
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerifierError {
    #[error("Verifier is already tracking; call stop() before starting again")]
    AlreadyTracking,

    #[error("Invalid cluster_node_count: {0}. Must be at least 1")]
    InvalidClusterNodeCount(usize),

    #[error("Failed to register placement listeners: {0}")]
    Registration(#[from] CoordinationError),
}
