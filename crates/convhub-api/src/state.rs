//! Application state shared across all handlers.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use convhub_convert::{
    BatchDispatcher, ConversionMetrics, ConverterRegistry, DispatchSettings, OutputPackager,
};
use convhub_core::config::AppConfig;

/// Shared application state, cheap to clone.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Loaded configuration.
    pub config: Arc<AppConfig>,
    /// Conversion-type registry.
    pub registry: Arc<ConverterRegistry>,
    /// Batch dispatcher.
    pub dispatcher: Arc<BatchDispatcher>,
    /// Output packager.
    pub packager: Arc<OutputPackager>,
    /// Conversion metrics.
    pub metrics: Arc<ConversionMetrics>,
    /// Process start time.
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Build the state with the built-in conversion types.
    pub fn new(config: AppConfig) -> Self {
        let registry = ConverterRegistry::with_defaults(&config.conversion);
        Self::with_registry(config, registry)
    }

    /// Build the state around an already populated registry.
    pub fn with_registry(config: AppConfig, registry: ConverterRegistry) -> Self {
        let metrics = Arc::new(ConversionMetrics::new());
        let registry = Arc::new(registry);
        let settings = DispatchSettings::from_config(&config.storage, &config.conversion);
        let dispatcher = Arc::new(BatchDispatcher::new(
            Arc::clone(&registry),
            settings,
            Arc::clone(&metrics),
        ));
        let packager = Arc::new(OutputPackager::new(Arc::clone(&metrics)));

        Self {
            config: Arc::new(config),
            registry,
            dispatcher,
            packager,
            metrics,
            started_at: Utc::now(),
        }
    }

    /// Seconds since the state was built.
    pub fn uptime_seconds(&self) -> u64 {
        u64::try_from((Utc::now() - self.started_at).num_seconds()).unwrap_or(0)
    }
}
