use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use mockex_core::model::{MetricSeries, Registry};
use prometheus::IntCounter;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::config::{ChaosSection, Schedule};

use super::jitter;

/// Spawns the background tasks that drive counter and gauge series.
#[derive(Clone)]
pub struct PerturbationEngine {
    chaos: f64,
    period: Duration,
    schedule: Schedule,
    seed: Option<u64>,
    ticks: Option<IntCounter>,
}

impl PerturbationEngine {
    pub fn new(cfg: &ChaosSection) -> Self {
        Self {
            chaos: cfg.coefficient,
            period: cfg.interval(),
            schedule: cfg.schedule,
            seed: cfg.seed,
            ticks: None,
        }
    }

    /// Count every applied update on `counter`.
    pub fn with_tick_counter(mut self, counter: IntCounter) -> Self {
        self.ticks = Some(counter);
        self
    }

    /// Start perturbing every live series of `registry`. Tasks stop at the
    /// next tick boundary once `token` is cancelled.
    ///
    /// Must be called inside a Tokio runtime. With a zero coefficient nothing
    /// is spawned.
    pub fn start(&self, registry: &Registry, token: CancellationToken) -> EngineHandle {
        let series = registry.live_series();
        if self.chaos <= 0.0 || series.is_empty() {
            tracing::info!(chaos = self.chaos, series = series.len(), "perturbation disabled");
            return EngineHandle {
                token,
                tasks: Vec::new(),
            };
        }

        let tasks: Vec<JoinHandle<()>> = match self.schedule {
            Schedule::PerSeries => series
                .into_iter()
                .enumerate()
                .map(|(i, s)| tokio::spawn(self.worker(i).run(vec![s], token.clone())))
                .collect(),
            Schedule::Consolidated => {
                vec![tokio::spawn(self.worker(0).run(series, token.clone()))]
            }
        };

        tracing::info!(
            chaos = self.chaos,
            interval_ms = self.period.as_millis() as u64,
            schedule = ?self.schedule,
            tasks = tasks.len(),
            "perturbation engine started"
        );
        EngineHandle { token, tasks }
    }

    fn worker(&self, index: usize) -> Worker {
        let rng = match self.seed {
            Some(seed) => SmallRng::seed_from_u64(seed.wrapping_add(index as u64)),
            None => SmallRng::from_entropy(),
        };
        Worker {
            chaos: self.chaos,
            period: self.period,
            rng,
            ticks: self.ticks.clone(),
        }
    }
}

struct Worker {
    chaos: f64,
    period: Duration,
    rng: SmallRng,
    ticks: Option<IntCounter>,
}

impl Worker {
    async fn run(mut self, series: Vec<Arc<MetricSeries>>, token: CancellationToken) {
        // First update one period after start, so a fresh listener serves the
        // snapshot values as read.
        let mut interval = interval_at(Instant::now() + self.period, self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = interval.tick() => {
                    for s in &series {
                        if jitter::tick(s, self.chaos, &mut self.rng) {
                            if let Some(ticks) = &self.ticks {
                                ticks.inc();
                            }
                        }
                    }
                }
            }
        }
    }
}

/// Running engine tasks.
pub struct EngineHandle {
    token: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl EngineHandle {
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Cancel every task and wait for them to finish.
    pub async fn shutdown(self) {
        self.token.cancel();
        for res in join_all(self.tasks).await {
            if let Err(e) = res {
                tracing::warn!(error = %e, "perturbation task ended abnormally");
            }
        }
    }
}
