//! Initializer Controller
//!
//! An out-of-tree dynamic admission initializer. It watches selected
//! resource types cluster-wide, finds objects whose pending-initializers
//! queue names this initializer first, lets a per-type handler accept
//! (optionally mutating) or reject each one, and writes the result back
//! while popping the queue head.
//!
//! Runs as a single process with a single initializer identity until
//! externally stopped.

mod admission;
mod advance;
mod backoff;
mod controller;
mod error;
mod watcher;
#[cfg(test)]
mod test_utils;

use crate::controller::{Controller, ControllerConfig};
use crate::error::ControllerError;
use std::env;
use std::time::Duration;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), ControllerError> {
    tracing_subscriber::fmt::init();

    info!("Starting initializer controller");

    // Load configuration from environment variables
    let initializer_name = env::var("INITIALIZER_NAME").map_err(|_| {
        ControllerError::InvalidConfig(
            "INITIALIZER_NAME environment variable is required".to_string(),
        )
    })?;
    let resources: Vec<String> = env::var("WATCH_RESOURCES")
        .unwrap_or_else(|_| "pods,jobs,deployments,daemonsets".to_string())
        .split(',')
        .map(|kind| kind.trim().to_string())
        .filter(|kind| !kind.is_empty())
        .collect();
    let idle_timeout_seconds = read_seconds("WATCH_TIMEOUT_SECONDS", 30)?;
    let fatal_backoff_min_seconds = read_seconds("FATAL_BACKOFF_MIN_SECONDS", 1)?;
    let fatal_backoff_max_seconds = read_seconds("FATAL_BACKOFF_MAX_SECONDS", 60)?;

    info!("Configuration:");
    info!("  Initializer name: {}", initializer_name);
    info!("  Watched resources: {}", resources.join(", "));
    info!("  Watch idle timeout: {}s", idle_timeout_seconds);
    if fatal_backoff_max_seconds == 0 {
        info!("  Fatal watch errors: immediate reconnect, no backoff");
    } else {
        info!(
            "  Fatal watch errors: reconnect with {}s..{}s backoff",
            fatal_backoff_min_seconds, fatal_backoff_max_seconds
        );
    }

    let config = ControllerConfig {
        initializer_name,
        resources,
        idle_timeout: Duration::from_secs(idle_timeout_seconds),
        fatal_backoff_min_seconds,
        fatal_backoff_max_seconds,
    };

    // Initialize and run until a worker dies or the process is signalled.
    let mut controller = Controller::new(config).await?;
    tokio::select! {
        result = controller.wait() => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
    }
    controller.stop().await?;

    Ok(())
}

fn read_seconds(var: &str, default: u64) -> Result<u64, ControllerError> {
    match env::var(var) {
        Ok(value) => value.parse().map_err(|_| {
            ControllerError::InvalidConfig(format!(
                "{var} must be a non-negative number of seconds"
            ))
        }),
        Err(_) => Ok(default),
    }
}
