//! Startup and shutdown sequence of the whole exporter.
//!
//! snapshot file -> registry -> {perturbation engine, listener fleet}.
//! Fatal startup errors are returned before any listener starts.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use mockex_core::error::Result;
use mockex_core::exposition::{load_snapshot, Snapshot};
use tokio_util::sync::CancellationToken;

use crate::app_state::AppState;
use crate::config::ExporterConfig;
use crate::listener::{Fleet, Orchestrator, ShutdownOutcome};
use crate::perturb::{EngineHandle, PerturbationEngine};

/// A running exporter: engine tasks plus one server per bound port.
pub struct Exporter {
    state: AppState,
    fleet: Fleet,
    engine: EngineHandle,
    grace: Duration,
}

impl Exporter {
    /// Load the configured snapshot and start serving it.
    pub async fn start(cfg: ExporterConfig) -> Result<Self> {
        cfg.validate()?;
        let snapshot = load_snapshot(&cfg.mock)?;
        tracing::info!(
            path = %cfg.mock.display(),
            families = snapshot.registry.len(),
            series = snapshot.registry.series_count(),
            skipped = snapshot.warnings.len(),
            "snapshot loaded"
        );
        Self::from_snapshot(cfg, snapshot).await
    }

    /// Start serving an already parsed snapshot.
    pub async fn from_snapshot(cfg: ExporterConfig, snapshot: Snapshot) -> Result<Self> {
        let registry = Arc::new(snapshot.registry);
        let state = AppState::new(cfg.clone(), Arc::clone(&registry))?;

        tracing::info!(
            chaos = cfg.chaos.coefficient,
            enabled = cfg.chaos.is_enabled(),
            "current chaos coefficient"
        );
        let engine = PerturbationEngine::new(&cfg.chaos)
            .with_tick_counter(state.metrics().perturbation_ticks.clone())
            .start(&registry, CancellationToken::new());

        let fleet = match Orchestrator::new(&cfg.web)
            .start(state.clone(), CancellationToken::new())
            .await
        {
            Ok(fleet) => fleet,
            Err(e) => {
                engine.shutdown().await;
                return Err(e);
            }
        };

        Ok(Self {
            state,
            fleet,
            engine,
            grace: cfg.web.shutdown_grace(),
        })
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn fleet(&self) -> &Fleet {
        &self.fleet
    }

    pub fn bound_ports(&self) -> Vec<u16> {
        self.fleet.bound_ports()
    }

    pub fn engine_tasks(&self) -> usize {
        self.engine.task_count()
    }

    /// Drain the listeners (bounded by the grace period), then stop the engine.
    pub async fn shutdown(self) -> ShutdownOutcome {
        let outcome = self.fleet.shutdown(self.grace).await;
        self.engine.shutdown().await;
        outcome
    }
}

/// Start, serve until `signal` resolves, then shut down.
pub async fn run_until<F>(cfg: ExporterConfig, signal: F) -> Result<ShutdownOutcome>
where
    F: Future<Output = ()>,
{
    let exporter = Exporter::start(cfg).await?;
    signal.await;
    Ok(exporter.shutdown().await)
}
