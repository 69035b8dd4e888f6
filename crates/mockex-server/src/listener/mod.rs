//! Listener orchestration: one HTTP server per port of a contiguous range.
//!
//! Lifecycle per port:
//! `Probing -> Bound -> Serving -> ShuttingDown -> Stopped`, or
//! `Probing -> Skipped` when the port is taken. Occupied ports never abort
//! the run; the count of bound ports is reported once the range is done.

pub mod fleet;
pub mod probe;
pub mod state;

pub use fleet::{Fleet, Orchestrator, ShutdownOutcome};
pub use state::{ListenerState, ListenerTable};
