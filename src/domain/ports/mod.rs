//! Port trait definitions (Hexagonal Architecture)
//!
//! This module defines the interfaces the verifier consumes:
//! - CoordinationService: listener registration with the cluster coordinator
//! - PlacementChangeListener: the two change-stream callbacks
//! - DiagnosticSink: operator-facing anomaly output
//!
//! Callbacks are synchronous; the coordination service owns the threads
//! they run on.

pub mod coordination;
pub mod diagnostic_sink;

pub use coordination::{CoordinationService, ListenerId, PlacementChangeListener};
pub use diagnostic_sink::DiagnosticSink;
