//! Verifier lifecycle state.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a convergence verifier.
///
/// `Stopped -> Tracking` via `start()`, `Tracking -> Stopped` via `stop()`.
/// Notifications delivered while `Stopped` are dropped, not queued.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerifierState {
    #[default]
    Stopped,
    Tracking,
}

impl VerifierState {
    pub const fn is_tracking(self) -> bool {
        matches!(self, Self::Tracking)
    }
}

impl fmt::Display for VerifierState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stopped => write!(f, "stopped"),
            Self::Tracking => write!(f, "tracking"),
        }
    }
}
