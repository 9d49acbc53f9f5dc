//! Application layer
//!
//! Use-case orchestration on top of the verifier services.

pub mod scenario_replay;

pub use scenario_replay::{Checkpoint, ReplayOutcome, ScenarioReplay};
