//! Metrics endpoint handler.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Extension,
};

use crate::app_state::AppState;

/// Port of the listener a request arrived on.
#[derive(Debug, Clone, Copy)]
pub struct ServedPort(pub u16);

pub async fn metrics(
    State(state): State<AppState>,
    Extension(ServedPort(port)): Extension<ServedPort>,
) -> Response {
    state.metrics().observe_scrape(port);

    let exposition = state.exposition();
    match exposition.render() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, exposition.content_type().to_string())],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(port, error = %e, "render failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "render failed").into_response()
        }
    }
}
