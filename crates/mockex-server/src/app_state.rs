//! Shared application state, cloned into every listener's router.

use std::sync::Arc;

use mockex_core::error::{MockError, Result};
use mockex_core::model::Registry;

use crate::config::ExporterConfig;
use crate::obs::{ExporterMetrics, Exposition};

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    cfg: ExporterConfig,
    registry: Arc<Registry>,
    metrics: ExporterMetrics,
    exposition: Exposition,
}

impl AppState {
    /// Build application state around an already parsed registry.
    pub fn new(cfg: ExporterConfig, registry: Arc<Registry>) -> Result<Self> {
        let metrics = ExporterMetrics::new()
            .map_err(|e| MockError::Internal(format!("exporter metrics: {e}")))?;
        metrics.snapshot_families.set(registry.len() as i64);
        metrics.snapshot_series.set(registry.series_count() as i64);

        let exposition =
            Exposition::new(Arc::clone(&registry), &metrics, cfg.web.process_metrics)?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                cfg,
                registry,
                metrics,
                exposition,
            }),
        })
    }

    pub fn cfg(&self) -> &ExporterConfig {
        &self.inner.cfg
    }

    pub fn registry(&self) -> Arc<Registry> {
        Arc::clone(&self.inner.registry)
    }

    pub fn metrics(&self) -> &ExporterMetrics {
        &self.inner.metrics
    }

    pub fn exposition(&self) -> &Exposition {
        &self.inner.exposition
    }
}
