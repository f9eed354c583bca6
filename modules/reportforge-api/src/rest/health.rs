//! Liveness and readiness probes.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use tracing::warn;

use crate::AppState;

/// GET /health — overall service health.
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ready_inner(&state).await
}

/// GET /health/live — the process is up.
pub async fn live() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

/// GET /health/ready — the queue backend answers.
pub async fn ready(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ready_inner(&state).await
}

async fn ready_inner(state: &AppState) -> axum::response::Response {
    match state.queue.stats().await {
        Ok(_) => (StatusCode::OK, Json(serde_json::json!({ "status": "ok" }))).into_response(),
        Err(e) => {
            warn!(error = %e, "Readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({ "status": "unavailable" })),
            )
                .into_response()
        }
    }
}
