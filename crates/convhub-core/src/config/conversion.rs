//! Conversion engine configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use validator::Validate;

/// How a batch reacts to a single bad file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Report the bad file and keep converting the rest.
    #[default]
    Isolate,
    /// Fail the whole request on the first bad file.
    Abort,
}

impl std::fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Isolate => write!(f, "isolate"),
            Self::Abort => write!(f, "abort"),
        }
    }
}

/// Tunables for the batch dispatcher and converters.
#[derive(Debug, Clone, Validate, Serialize, Deserialize)]
pub struct ConversionConfig {
    /// Per-file conversion timeout in seconds.
    #[serde(default = "default_timeout_seconds")]
    #[validate(range(min = 1, max = 7200))]
    pub timeout_seconds: u64,

    /// Maximum conversions running at once within one batch.
    #[serde(default = "default_max_concurrency")]
    #[validate(range(min = 1, max = 16))]
    pub max_concurrency: usize,

    /// Per-file failure handling.
    #[serde(default)]
    pub failure_policy: FailurePolicy,

    /// Minimum output size (bytes) for a conversion to count as successful.
    #[serde(default = "default_min_output_bytes")]
    #[validate(range(min = 1))]
    pub min_output_bytes: u64,

    /// Explicit ffmpeg location. Falls back to `PATH` lookup when unset or
    /// missing on disk.
    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,

    /// Conversion-type identifiers to switch off (e.g. `["mp4_to_avi"]`).
    #[serde(default)]
    pub disabled_types: Vec<String>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout_seconds(),
            max_concurrency: default_max_concurrency(),
            failure_policy: FailurePolicy::default(),
            min_output_bytes: default_min_output_bytes(),
            ffmpeg_path: None,
            disabled_types: Vec::new(),
        }
    }
}

fn default_timeout_seconds() -> u64 {
    300
}

fn default_max_concurrency() -> usize {
    4
}

fn default_min_output_bytes() -> u64 {
    1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(ConversionConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let config = ConversionConfig {
            max_concurrency: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_policy_parses_lowercase() {
        let policy: FailurePolicy = serde_json::from_str("\"abort\"").expect("parse");
        assert_eq!(policy, FailurePolicy::Abort);
        assert_eq!(FailurePolicy::default(), FailurePolicy::Isolate);
    }
}
