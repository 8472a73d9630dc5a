//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section; every field has a default so an empty file is a valid config.

pub mod app;
pub mod conversion;
pub mod logging;
pub mod storage;

use std::path::Path;

use serde::{Deserialize, Serialize};
use validator::Validate;

pub use self::app::{CorsConfig, ServerConfig};
pub use self::conversion::{ConversionConfig, FailurePolicy};
pub use self::logging::LoggingConfig;
pub use self::storage::StorageConfig;

use crate::error::AppError;

/// Root application configuration.
///
/// This struct is the top-level deserialization target for the merged
/// TOML configuration files (default.toml + environment overlay).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Upload/output storage settings.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Conversion engine settings.
    #[serde(default)]
    pub conversion: ConversionConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from TOML files in `config_dir`.
    ///
    /// Merges `default.toml` with an environment-specific overlay and
    /// environment variables prefixed with `CONVHUB__`
    /// (e.g. `CONVHUB__SERVER__PORT=9000`).
    pub fn load(config_dir: &Path, env: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::from(config_dir.join("default")).required(false))
            .add_source(config::File::from(config_dir.join(env)).required(false))
            .add_source(
                config::Environment::with_prefix("CONVHUB")
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("conversion.disabled_types")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        let config: Self = config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Check value ranges that serde cannot express.
    pub fn validate(&self) -> Result<(), AppError> {
        self.conversion.validate()?;

        if self.storage.upload_dir == self.storage.converted_dir {
            return Err(AppError::configuration(
                "storage.upload_dir and storage.converted_dir must differ",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_missing_files_uses_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = AppConfig::load(dir.path(), "test").expect("load");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.conversion.failure_policy, FailurePolicy::Isolate);
    }

    #[test]
    fn test_env_overlay_overrides_default() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(
            dir.path().join("default.toml"),
            "[conversion]\ntimeout_seconds = 60\nmax_concurrency = 2\n",
        )
        .expect("write default");
        std::fs::write(
            dir.path().join("staging.toml"),
            "[conversion]\nfailure_policy = \"abort\"\n",
        )
        .expect("write overlay");

        let config = AppConfig::load(dir.path(), "staging").expect("load");
        assert_eq!(config.conversion.timeout_seconds, 60);
        assert_eq!(config.conversion.max_concurrency, 2);
        assert_eq!(config.conversion.failure_policy, FailurePolicy::Abort);
    }

    #[test]
    fn test_out_of_range_value_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(
            dir.path().join("default.toml"),
            "[conversion]\nmax_concurrency = 64\n",
        )
        .expect("write default");

        let err = AppConfig::load(dir.path(), "test").expect_err("should fail");
        assert_eq!(err.kind, crate::error::ErrorKind::Configuration);
    }

    #[test]
    fn test_same_storage_dirs_rejected() {
        let mut config = AppConfig::default();
        config.storage.converted_dir = config.storage.upload_dir.clone();
        assert!(config.validate().is_err());
    }
}
