//! Conversion-type listing.

use axum::Json;
use axum::extract::State;

use crate::dto::response::{ApiResponse, ConversionListResponse};
use crate::state::AppState;

/// GET /api/conversions
pub async fn list_conversions(
    State(state): State<AppState>,
) -> Json<ApiResponse<ConversionListResponse>> {
    Json(ApiResponse::ok(ConversionListResponse {
        conversions: state.registry.describe(),
    }))
}
