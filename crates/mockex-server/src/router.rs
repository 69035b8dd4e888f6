//! Axum router wiring.
//!
//! Exposes exactly one route, the configured metrics path.

use axum::{routing::get, Extension, Router};

use crate::{app_state::AppState, ops};

/// Router for the listener on `port`.
pub fn build_router(state: AppState, port: u16) -> Router {
    let path = state.cfg().web.path.clone();
    Router::new()
        .route(&path, get(ops::metrics))
        .layer(Extension(ops::ServedPort(port)))
        .with_state(state)
}
