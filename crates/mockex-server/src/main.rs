//! mock-exporter
//!
//! Serves one Prometheus snapshot on a range of ports, with counters and
//! gauges drifting according to the chaos coefficient.

use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mockex_server::{cli::Cli, listener::ShutdownOutcome, run_until};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cfg = match Cli::parse().into_config() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!(error = %e, code = e.code().as_str(), "invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    info!(version = env!("CARGO_PKG_VERSION"), "starting mock exporter");

    match run_until(cfg, shutdown_signal()).await {
        Ok(ShutdownOutcome::Drained) => {
            info!("shutdown complete");
            ExitCode::SUCCESS
        }
        Ok(ShutdownOutcome::TimedOut { pending }) => {
            warn!(pending, "shutdown incomplete, exiting anyway");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, code = e.code().as_str(), "mock exporter failed");
            ExitCode::FAILURE
        }
    }
}

/// Resolves on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("signal received, starting graceful shutdown");
}
