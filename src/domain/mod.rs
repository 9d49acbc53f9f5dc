//! Domain layer for the placement verifier
//!
//! This module contains placement models, the verifier's error types and the
//! ports through which the verifier talks to the coordination service.

pub mod error;
pub mod models;
pub mod ports;

// Re-export error types for convenient access
pub use error::{CoordinationError, VerifierError};
