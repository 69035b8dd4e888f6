//! Self-metrics of the exporter, appended to every scrape.

use prometheus::{IntCounter, IntCounterVec, IntGauge, Opts, Registry};

pub struct ExporterMetrics {
    pub scrapes: IntCounterVec,
    pub listeners_bound: IntGauge,
    pub snapshot_families: IntGauge,
    pub snapshot_series: IntGauge,
    pub perturbation_ticks: IntCounter,
}

impl ExporterMetrics {
    pub fn new() -> prometheus::Result<Self> {
        Ok(Self {
            scrapes: IntCounterVec::new(
                Opts::new("mockex_scrapes_total", "Scrape requests served, by listener port."),
                &["port"],
            )?,
            listeners_bound: IntGauge::new(
                "mockex_listeners_bound",
                "Listeners bound by the last orchestrator run.",
            )?,
            snapshot_families: IntGauge::new(
                "mockex_snapshot_families",
                "Metric families loaded from the snapshot.",
            )?,
            snapshot_series: IntGauge::new(
                "mockex_snapshot_series",
                "Series loaded from the snapshot.",
            )?,
            perturbation_ticks: IntCounter::new(
                "mockex_perturbation_ticks_total",
                "Series updates applied by the perturbation engine.",
            )?,
        })
    }

    /// Register every collector into `registry`.
    pub fn register(&self, registry: &Registry) -> prometheus::Result<()> {
        registry.register(Box::new(self.scrapes.clone()))?;
        registry.register(Box::new(self.listeners_bound.clone()))?;
        registry.register(Box::new(self.snapshot_families.clone()))?;
        registry.register(Box::new(self.snapshot_series.clone()))?;
        registry.register(Box::new(self.perturbation_ticks.clone()))?;
        Ok(())
    }

    /// Count one scrape on `port`.
    pub fn observe_scrape(&self, port: u16) {
        self.scrapes.with_label_values(&[&port.to_string()]).inc();
    }
}
