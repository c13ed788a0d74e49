//! Periscope Server
//!
//! Run with: cargo run
//!
//! Environment variables:
//! - PERISCOPE_SOCKET: Path of the Unix socket (default: /tmp/periscope.sock)
//! - PERISCOPE_OBJECTS: JSON snapshot of the monitoring core to serve (default: empty core)
//! - PERISCOPE_STATS_INTERVAL_SECS: Counter rate refresh interval (default: 5)
//! - PERISCOPE_MAX_REQUEST_BYTES: Largest accepted request block (default: 1048576)
//! - RUST_LOG: Log level (default: periscope=info)

use periscope::api::{run_server, ServerConfig};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "periscope=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let defaults = ServerConfig::default();

    // Parse configuration from environment
    let socket_path = std::env::var("PERISCOPE_SOCKET")
        .map(PathBuf::from)
        .unwrap_or(defaults.socket_path);
    let objects_path = std::env::var("PERISCOPE_OBJECTS")
        .ok()
        .filter(|p| !p.trim().is_empty())
        .map(PathBuf::from);
    let stats_interval = std::env::var("PERISCOPE_STATS_INTERVAL_SECS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .filter(|&s| s > 0)
        .map(Duration::from_secs)
        .unwrap_or(defaults.stats_interval);
    let max_request_bytes = std::env::var("PERISCOPE_MAX_REQUEST_BYTES")
        .ok()
        .and_then(|b| b.parse::<usize>().ok())
        .unwrap_or(defaults.max_request_bytes);

    let config = ServerConfig {
        socket_path,
        objects_path,
        stats_interval,
        max_request_bytes,
    };

    tracing::info!("Periscope configuration:");
    tracing::info!("  Socket: {}", config.socket_path.display());
    match &config.objects_path {
        Some(path) => tracing::info!("  Objects: {}", path.display()),
        None => tracing::info!("  Objects: none (empty core)"),
    }
    tracing::info!("  Statistics interval: {:?}", config.stats_interval);
    tracing::info!("  Max request size: {} bytes", config.max_request_bytes);

    run_server(config).await?;
    Ok(())
}
