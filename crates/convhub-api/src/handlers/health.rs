//! Health check handlers.

use axum::Json;
use axum::extract::State;

use crate::dto::response::{ApiResponse, DetailedHealthResponse, HealthResponse};
use crate::state::AppState;

/// GET /api/health
pub async fn health(State(state): State<AppState>) -> Json<ApiResponse<HealthResponse>> {
    Json(ApiResponse::ok(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime_seconds(),
    }))
}

/// GET /api/health/detailed
pub async fn health_detailed(
    State(state): State<AppState>,
) -> Json<ApiResponse<DetailedHealthResponse>> {
    let tools = state.registry.tools();
    let needs_ffmpeg = state.registry.entries().any(|e| e.kind.requires_ffmpeg());
    let degraded = needs_ffmpeg && tools.iter().any(|t| !t.available);

    Json(ApiResponse::ok(DetailedHealthResponse {
        status: if degraded { "degraded" } else { "ok" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime_seconds(),
        failure_policy: state.config.conversion.failure_policy.to_string(),
        conversion_types: state.registry.entries().count(),
        tools,
        metrics: state.metrics.snapshot(),
    }))
}
