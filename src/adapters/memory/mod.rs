//! In-process adapters.

pub mod coordination;

pub use coordination::InMemoryCoordinationService;
