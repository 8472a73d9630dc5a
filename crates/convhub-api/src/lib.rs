//! # convhub-api
//!
//! HTTP API layer for ConvHub built on Axum.
//!
//! Provides the upload form, the batch conversion endpoint, the
//! conversion-type listing and health checks, plus middleware (CORS,
//! compression, request logging) and the `AppError` → HTTP mapping.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use router::build_router;
pub use state::AppState;
