//! Scoped listener registration.
//!
//! A [`ListenerRegistration`] owns the registration handles for both
//! placement streams. Dropping it deregisters them, so a verifier that is
//! dropped or unwound out of a scenario never leaves listeners behind.

use std::sync::Arc;

use crate::domain::error::CoordinationError;
use crate::domain::models::PlacementStream;
use crate::domain::ports::{CoordinationService, ListenerId, PlacementChangeListener};

/// Registration of one listener on both placement streams.
pub struct ListenerRegistration {
    coordination: Arc<dyn CoordinationService>,
    handles: Vec<(PlacementStream, ListenerId)>,
}

impl ListenerRegistration {
    /// Register `listener` for every placement stream.
    ///
    /// All-or-nothing: if any registration fails, the ones already made are
    /// deregistered before the error is returned.
    pub fn acquire(
        coordination: Arc<dyn CoordinationService>,
        listener: &Arc<dyn PlacementChangeListener>,
    ) -> Result<Self, CoordinationError> {
        let mut registration = Self {
            coordination,
            handles: Vec::with_capacity(PlacementStream::ALL.len()),
        };

        for stream in PlacementStream::ALL {
            let id = registration
                .coordination
                .register(stream, Arc::clone(listener))?;
            tracing::debug!(%stream, listener_id = %id, "Registered placement listener");
            registration.handles.push((stream, id));
        }

        Ok(registration)
    }

    /// Registered handles, in registration order.
    pub fn handles(&self) -> &[(PlacementStream, ListenerId)] {
        &self.handles
    }

    /// Deregister explicitly, reporting the first failure.
    pub fn release(mut self) -> Result<(), CoordinationError> {
        self.deregister_all()
    }

    fn deregister_all(&mut self) -> Result<(), CoordinationError> {
        let mut first_error = None;
        for (stream, id) in self.handles.drain(..) {
            match self.coordination.deregister(id) {
                Ok(()) => {
                    tracing::debug!(%stream, listener_id = %id, "Deregistered placement listener");
                }
                Err(err) => {
                    tracing::warn!(%stream, listener_id = %id, error = %err, "Failed to deregister placement listener");
                    first_error.get_or_insert(err);
                }
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

impl Drop for ListenerRegistration {
    fn drop(&mut self) {
        // Failures are already logged by deregister_all
        let _ = self.deregister_all();
    }
}
