//! Perturbation engine: keeps counter and gauge series moving.
//!
//! - `jitter`: the per-tick update rule for one series.
//! - `engine`: task scheduling and cancellation.

pub mod engine;
pub mod jitter;

pub use engine::{EngineHandle, PerturbationEngine};
