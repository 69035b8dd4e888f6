//! mockex: serve a recorded Prometheus snapshot as if it came from live
//! exporters.
//!
//! ```no_run
//! use mockex::prelude::*;
//!
//! # async fn demo() -> Result<()> {
//! let cfg = ExporterConfig::with_mock("node.prom");
//! let exporter = Exporter::start(cfg).await?;
//! println!("serving on {:?}", exporter.bound_ports());
//! exporter.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub use mockex_core as core;
pub use mockex_server as server;

/// Items most embedders need.
pub mod prelude {
    pub use mockex_core::exposition::{load_snapshot, parse_snapshot, Snapshot};
    pub use mockex_core::model::{MetricKind, Registry, SeriesValue};
    pub use mockex_core::{MockError, Result};
    pub use mockex_server::config::{ChaosSection, ExporterConfig, Schedule, WebSection};
    pub use mockex_server::listener::ShutdownOutcome;
    pub use mockex_server::{run_until, Exporter};
}
