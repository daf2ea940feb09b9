//! Liveness check.

use super::HandlerContext;
use axum::extract::State;
use axum::Json;
use serde::Serialize;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,

    /// Gateway version.
    pub version: &'static str,

    /// Uptime in seconds.
    pub uptime_seconds: u64,
}

/// `GET /health`. Reports process liveness only, never session readiness.
pub async fn health(State(ctx): State<HandlerContext>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: ctx.started_at.elapsed().as_secs(),
    })
}
