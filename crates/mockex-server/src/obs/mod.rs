//! Exposition of the snapshot registry plus the exporter's own collectors.
//!
//! Text encoding is delegated to the `prometheus` crate. Snapshot families
//! are converted to its protobuf model on every scrape, reading each series'
//! atomic cell once.

pub mod exposition;
pub mod metrics;

pub use exposition::Exposition;
pub use metrics::ExporterMetrics;
