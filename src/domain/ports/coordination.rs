use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::error::CoordinationError;
use crate::domain::models::{ActualPlacement, DeclaredPlacement, PlacementStream};

/// Handle identifying one listener registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListenerId(pub Uuid);

impl ListenerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ListenerId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ListenerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Capability interface for receiving placement change batches.
///
/// Invoked from the coordination service's notification threads, possibly
/// concurrently for the two streams. Implementations must not block.
pub trait PlacementChangeListener: Send + Sync {
    /// Declared (target) placement changed for the resources in the batch.
    fn on_declared_placement_changed(&self, placements: &[DeclaredPlacement]);

    /// Actual (reported) placement changed for the resources in the batch.
    fn on_actual_placement_changed(&self, placements: &[ActualPlacement]);
}

/// Port for the coordination service's listener registration API
pub trait CoordinationService: Send + Sync {
    /// Register a listener for one placement stream.
    fn register(
        &self,
        stream: PlacementStream,
        listener: Arc<dyn PlacementChangeListener>,
    ) -> Result<ListenerId, CoordinationError>;

    /// Remove a previously registered listener. Once this returns, the
    /// service starts no new deliveries to it.
    fn deregister(&self, id: ListenerId) -> Result<(), CoordinationError>;
}
