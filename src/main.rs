//! ConvHub Server: batch file conversion over HTTP
//!
//! Main entry point that wires the crates together and starts the server.

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt};

use convhub_api::AppState;
use convhub_core::AppResult;
use convhub_core::config::AppConfig;
use convhub_core::error::AppError;

/// ConvHub batch file conversion server
#[derive(Debug, Parser)]
#[command(name = "convhub-server", version, about, long_about = None)]
struct Cli {
    /// Directory holding `default.toml` and environment overlays
    #[arg(short, long, env = "CONVHUB_CONFIG_DIR", default_value = "config")]
    config_dir: PathBuf,

    /// Environment overlay to load (`<config-dir>/<env>.toml`)
    #[arg(short, long, env = "CONVHUB_ENV", default_value = "development")]
    env: String,

    /// Override `server.host`
    #[arg(long)]
    host: Option<String>,

    /// Override `server.port`
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_configuration(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

/// Load configuration files, environment variables and CLI overrides
fn load_configuration(cli: &Cli) -> AppResult<AppConfig> {
    let mut config = AppConfig::load(&cli.config_dir, &cli.env)?;

    if let Some(host) = &cli.host {
        config.server.host = host.clone();
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    Ok(config)
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main server run function
async fn run(config: AppConfig) -> AppResult<()> {
    tracing::info!("Starting ConvHub v{}", env!("CARGO_PKG_VERSION"));

    create_data_directories(&config).await?;

    let state = AppState::new(config.clone());
    let ffmpeg = state.registry.ffmpeg().map(|p| p.display().to_string());
    tracing::info!(
        conversion_types = state.registry.entries().count(),
        failure_policy = %config.conversion.failure_policy,
        max_concurrency = config.conversion.max_concurrency,
        ffmpeg = ffmpeg.as_deref().unwrap_or("not found"),
        "Conversion engine ready"
    );
    if ffmpeg.is_none() {
        tracing::warn!("ffmpeg not found; audio and video conversions will fail per file");
    }

    let app = convhub_api::build_router(state);

    let addr = config.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {addr}: {e}")))?;

    tracing::info!("ConvHub server listening on {}", addr);

    let grace = std::time::Duration::from_secs(config.server.shutdown_grace_seconds);
    let server = axum::serve(listener, app).with_graceful_shutdown(async {
        shutdown_signal().await;
        tracing::info!("Shutdown signal received, starting graceful shutdown...");
    });

    // In-flight batches get `shutdown_grace_seconds` to finish once the
    // signal has arrived.
    tokio::select! {
        result = server => {
            result.map_err(|e| AppError::internal(format!("Server error: {e}")))?;
        }
        _ = async {
            shutdown_signal().await;
            tokio::time::sleep(grace).await;
        } => {
            tracing::warn!("Graceful shutdown timed out after {}s", grace.as_secs());
        }
    }

    tracing::info!("ConvHub server shut down");
    Ok(())
}

/// Create upload and output roots
async fn create_data_directories(config: &AppConfig) -> AppResult<()> {
    for dir in [&config.storage.upload_dir, &config.storage.converted_dir] {
        tokio::fs::create_dir_all(dir).await.map_err(|e| {
            AppError::storage(format!("Failed to create dir '{}': {e}", dir.display()))
        })?;
    }

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
