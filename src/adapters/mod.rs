//! Infrastructure adapters for external systems.

pub mod memory;
