//! Route definitions for the ConvHub HTTP API.
//!
//! The upload form and its POST target live at `/`; everything else is
//! mounted under `/api`.

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware;
use crate::middleware::compression::build_compression_layer;
use crate::middleware::cors::build_cors_layer;
use crate::state::AppState;

/// Build the complete Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let max_upload = usize::try_from(state.config.storage.max_upload_size_bytes)
        .unwrap_or(usize::MAX);

    let api_routes = Router::new()
        .merge(conversion_routes())
        .merge(health_routes());

    let cors = build_cors_layer(&state.config.server.cors);

    Router::new()
        .route(
            "/",
            get(handlers::form::upload_form).post(handlers::convert::convert),
        )
        .nest("/api", api_routes)
        .layer(DefaultBodyLimit::max(max_upload))
        .layer(build_compression_layer())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(axum_middleware::from_fn(
            middleware::logging::request_logging,
        ))
        .with_state(state)
}

/// Batch conversion and conversion-type listing
fn conversion_routes() -> Router<AppState> {
    Router::new()
        .route("/convert", post(handlers::convert::convert))
        .route("/conversions", get(handlers::conversions::list_conversions))
}

/// Health checks
fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/health/detailed", get(handlers::health::health_detailed))
}
