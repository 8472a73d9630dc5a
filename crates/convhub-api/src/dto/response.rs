//! Response DTOs.

use serde::{Deserialize, Serialize};

use convhub_convert::{ConversionInfo, MetricsSnapshot, ToolInfo};

/// Standard success response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T: Serialize> {
    /// Whether the request was successful.
    pub success: bool,
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Creates a successful response.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Status.
    pub status: String,
    /// Version.
    pub version: String,
    /// Uptime.
    pub uptime_seconds: u64,
}

/// Detailed health response.
#[derive(Debug, Clone, Serialize)]
pub struct DetailedHealthResponse {
    /// `"ok"`, or `"degraded"` when an enabled conversion type needs a
    /// missing tool.
    pub status: String,
    /// Version.
    pub version: String,
    /// Uptime.
    pub uptime_seconds: u64,
    /// Active failure policy.
    pub failure_policy: String,
    /// Number of enabled conversion types.
    pub conversion_types: usize,
    /// External tool availability.
    pub tools: Vec<ToolInfo>,
    /// Conversion counters and duration percentiles.
    pub metrics: MetricsSnapshot,
}

/// Enabled conversion types.
#[derive(Debug, Clone, Serialize)]
pub struct ConversionListResponse {
    /// Conversion types in identifier order.
    pub conversions: Vec<ConversionInfo>,
}
