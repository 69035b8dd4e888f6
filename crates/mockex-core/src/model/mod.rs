//! In-memory metric model.
//!
//! A `Registry` owns `MetricFamily` values keyed by name. Each family holds
//! its series behind `Arc` so the perturbation engine can keep a handle to a
//! single series without touching the registry again. Counter and gauge
//! values live in per-series atomic cells; summaries and histograms are
//! immutable snapshots.

pub mod family;
pub mod registry;
pub mod value;

pub use family::{LabelSet, MetricFamily, MetricKind, MetricSeries};
pub use registry::Registry;
pub use value::{AtomicF64, CounterValue, GaugeValue, HistogramSnapshot, SeriesValue, SummarySnapshot};
