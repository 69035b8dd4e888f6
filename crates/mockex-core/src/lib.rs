//! mockex core: the in-memory metric model, the exposition snapshot parser,
//! and the error surface shared with the server crate.
//!
//! This crate carries no runtime or transport dependencies. The server owns
//! scheduling and HTTP; everything here is synchronous and allocation-only.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here. Malformed snapshot
//! input surfaces as `MockError`/`Result` with the offending line number.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod exposition;
pub mod model;

/// Shared result type.
pub use error::{MockError, Result};
