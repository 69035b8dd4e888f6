//! mockex server library entry.
//!
//! Wires the snapshot registry, the perturbation engine, and the listener
//! fleet into a runnable exporter. Consumed by the binary (`main.rs`) and by
//! integration tests.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod app_state;
pub mod cli;
pub mod config;
pub mod exporter;
pub mod listener;
pub mod obs;
pub mod ops;
pub mod perturb;
pub mod router;

pub use exporter::{run_until, Exporter};
