use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Overall service status.
    pub status: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
    /// Whether the database is reachable; `None` with the in-memory store.
    pub db_healthy: Option<bool>,
    /// Live dispatcher workers.
    pub workers: usize,
    /// Tasks waiting for a worker.
    pub queued: usize,
}

/// GET /health -- returns service, database and dispatcher health.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let db_healthy = match &state.pool {
        Some(pool) => Some(aigc_db::health_check(pool).await.is_ok()),
        None => None,
    };
    let stats = state.tasks.dispatcher().stats();

    let status = if db_healthy == Some(false) { "degraded" } else { "ok" };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        db_healthy,
        workers: stats.workers,
        queued: stats.queued,
    })
}

/// Mount health check routes (intended for root-level, NOT under `/api/v1`).
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
