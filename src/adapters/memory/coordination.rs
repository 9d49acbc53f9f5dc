//! In-memory coordination service.
//!
//! Keeps registered listeners per stream and fans published batches out to
//! them synchronously on the publishing thread. Used by the replay CLI and
//! by tests standing in for a live coordination service.

use std::sync::{Arc, PoisonError, RwLock};

use crate::domain::error::CoordinationError;
use crate::domain::models::{ActualPlacement, DeclaredPlacement, PlacementStream};
use crate::domain::ports::{CoordinationService, ListenerId, PlacementChangeListener};

struct Subscription {
    id: ListenerId,
    stream: PlacementStream,
    listener: Arc<dyn PlacementChangeListener>,
}

/// Coordination service backed by an in-process listener table.
#[derive(Default)]
pub struct InMemoryCoordinationService {
    subscriptions: RwLock<Vec<Subscription>>,
}

impl InMemoryCoordinationService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of listeners currently registered for a stream.
    pub fn listener_count(&self, stream: PlacementStream) -> usize {
        self.subscriptions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|s| s.stream == stream)
            .count()
    }

    /// Deliver a declared batch to every declared-stream listener.
    /// Returns the number of listeners notified.
    pub fn publish_declared(&self, placements: &[DeclaredPlacement]) -> usize {
        let listeners = self.listeners(PlacementStream::Declared);
        for listener in &listeners {
            listener.on_declared_placement_changed(placements);
        }
        listeners.len()
    }

    /// Deliver an actual batch to every actual-stream listener.
    /// Returns the number of listeners notified.
    pub fn publish_actual(&self, placements: &[ActualPlacement]) -> usize {
        let listeners = self.listeners(PlacementStream::Actual);
        for listener in &listeners {
            listener.on_actual_placement_changed(placements);
        }
        listeners.len()
    }

    /// Listeners are cloned out so callbacks run without holding the table
    /// lock; a callback may then safely race with (de)registration.
    fn listeners(&self, stream: PlacementStream) -> Vec<Arc<dyn PlacementChangeListener>> {
        self.subscriptions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|s| s.stream == stream)
            .map(|s| Arc::clone(&s.listener))
            .collect()
    }
}

impl CoordinationService for InMemoryCoordinationService {
    fn register(
        &self,
        stream: PlacementStream,
        listener: Arc<dyn PlacementChangeListener>,
    ) -> Result<ListenerId, CoordinationError> {
        let id = ListenerId::new();
        self.subscriptions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Subscription {
                id,
                stream,
                listener,
            });
        Ok(id)
    }

    fn deregister(&self, id: ListenerId) -> Result<(), CoordinationError> {
        let mut subscriptions = self
            .subscriptions
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = subscriptions.len();
        subscriptions.retain(|s| s.id != id);
        if subscriptions.len() == before {
            return Err(CoordinationError::UnknownListener(id));
        }
        Ok(())
    }
}
