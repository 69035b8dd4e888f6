use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use futures_util::future::join_all;
use mockex_core::error::{MockError, Result};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::app_state::AppState;
use crate::config::WebSection;
use crate::router;

use super::probe;
use super::state::{ListenerState, ListenerTable};

/// How a fleet shutdown ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// Every listener drained within the grace period.
    Drained,
    /// The grace period ran out; `pending` listeners were aborted.
    TimedOut { pending: usize },
}

/// Binds the configured port range.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    host: IpAddr,
    base: u16,
    length: u16,
    fail_when_unbound: bool,
}

impl Orchestrator {
    pub fn new(web: &WebSection) -> Self {
        Self {
            host: web.host,
            base: web.port,
            length: web.length,
            fail_when_unbound: web.fail_when_unbound,
        }
    }

    /// Try every port of the range once and start a server on each one that
    /// binds. Occupied ports are skipped with a warning.
    ///
    /// Fails with `NoListeners` only when nothing could be bound and
    /// `fail_when_unbound` is set.
    pub async fn start(&self, state: AppState, token: CancellationToken) -> Result<Fleet> {
        let table = Arc::new(ListenerTable::new());
        let mut tasks = Vec::new();
        let mut skipped = Vec::new();
        let mut out_of_range = 0usize;

        for offset in 0..self.length {
            let Some(port) = self.base.checked_add(offset) else {
                out_of_range = usize::from(self.length - offset);
                tracing::warn!(
                    base = self.base,
                    out_of_range,
                    "port range runs past 65535, remaining ports skipped"
                );
                break;
            };

            table.begin(port);
            let addr = SocketAddr::new(self.host, port);

            if !probe::is_available(addr) {
                table.transition(port, ListenerState::Skipped);
                skipped.push(port);
                tracing::warn!(port, "port already in use, skipping");
                continue;
            }

            let listener = match TcpListener::bind(addr).await {
                Ok(l) => l,
                Err(e) => {
                    table.transition(port, ListenerState::Skipped);
                    skipped.push(port);
                    tracing::warn!(port, error = %e, "bind failed after probe, skipping");
                    continue;
                }
            };
            table.transition(port, ListenerState::Bound);

            let app = router::build_router(state.clone(), port);
            table.transition(port, ListenerState::Serving);
            let handle = tokio::spawn(serve(
                listener,
                app,
                port,
                Arc::clone(&table),
                token.clone(),
            ));
            tasks.push((port, handle));
        }

        let bound = tasks.len();
        state.metrics().listeners_bound.set(bound as i64);
        tracing::info!(
            bound,
            requested = self.length,
            skipped = skipped.len() + out_of_range,
            path = %state.cfg().web.path,
            "{bound} ports have started listening"
        );

        if bound == 0 {
            if self.fail_when_unbound {
                return Err(MockError::NoListeners {
                    base: self.base,
                    end: u32::from(self.base) + u32::from(self.length),
                });
            }
            tracing::warn!("no port of the range could be bound, nothing is served");
        }

        Ok(Fleet {
            table,
            tasks,
            skipped,
            token,
        })
    }
}

async fn serve(
    listener: TcpListener,
    app: Router,
    port: u16,
    table: Arc<ListenerTable>,
    token: CancellationToken,
) {
    let shutdown_table = Arc::clone(&table);
    let shutdown = async move {
        token.cancelled().await;
        shutdown_table.transition(port, ListenerState::ShuttingDown);
    };

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
    {
        tracing::error!(port, error = %e, "listener failed");
    }

    table.transition(port, ListenerState::Stopped);
    tracing::debug!(port, "listener stopped");
}

/// Listeners started by one orchestrator run.
pub struct Fleet {
    table: Arc<ListenerTable>,
    tasks: Vec<(u16, JoinHandle<()>)>,
    skipped: Vec<u16>,
    token: CancellationToken,
}

impl Fleet {
    /// Ports with a running server, ascending.
    pub fn bound_ports(&self) -> Vec<u16> {
        let mut ports: Vec<u16> = self.tasks.iter().map(|(p, _)| *p).collect();
        ports.sort_unstable();
        ports
    }

    pub fn bound_count(&self) -> usize {
        self.tasks.len()
    }

    pub fn skipped_ports(&self) -> &[u16] {
        &self.skipped
    }

    /// Shared state table. Stays readable after the fleet is shut down.
    pub fn table(&self) -> Arc<ListenerTable> {
        Arc::clone(&self.table)
    }

    /// Stop accepting, drain in-flight requests, and wait up to `grace`.
    /// Servers still running after that are aborted.
    pub async fn shutdown(self, grace: Duration) -> ShutdownOutcome {
        self.token.cancel();

        let (ports, handles): (Vec<u16>, Vec<JoinHandle<()>>) = self.tasks.into_iter().unzip();
        let aborts: Vec<_> = handles.iter().map(|h| h.abort_handle()).collect();

        match tokio::time::timeout(grace, join_all(handles)).await {
            Ok(results) => {
                for res in results {
                    if let Err(e) = res {
                        tracing::warn!(error = %e, "listener task ended abnormally");
                    }
                }
                tracing::info!(listeners = ports.len(), "all listeners drained");
                ShutdownOutcome::Drained
            }
            Err(_) => {
                let mut pending = 0;
                for (port, abort) in ports.iter().zip(aborts) {
                    if self.table.get(*port).is_some_and(|s| !s.is_terminal()) {
                        pending += 1;
                        abort.abort();
                        self.table.transition(*port, ListenerState::Stopped);
                    }
                }
                tracing::warn!(
                    pending,
                    grace_ms = grace.as_millis() as u64,
                    "shutdown grace period elapsed, aborting remaining listeners"
                );
                ShutdownOutcome::TimedOut { pending }
            }
        }
    }
}
