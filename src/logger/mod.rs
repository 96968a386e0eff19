//! Logger module
//!
//! Provides logging utilities for the HTTP server including:
//! - Subscriber setup (level, output format)
//! - Server lifecycle logging
//! - Access logging with multiple formats
//! - Error and warning logging

mod format;

pub use format::AccessLogEntry;

use crate::config::Config;
use crate::dataset::DatasetError;
use hyper::{Method, Uri, Version};
use std::net::SocketAddr;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Target used for access log lines, so they can be filtered separately
const ACCESS_TARGET: &str = "access";

/// Initialize the global subscriber
///
/// Should be called once at application startup. `RUST_LOG` wins over the
/// configured level; development mode raises the default to `debug`.
pub fn init(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let default_level = if config.app.debug {
        "debug"
    } else {
        config.logging.level.as_str()
    };
    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(default_level))?;

    let registry = tracing_subscriber::registry().with(env_filter);
    match config.logging.format.as_str() {
        "json" => registry.with(tracing_subscriber::fmt::layer().json()).try_init()?,
        "compact" => registry
            .with(tracing_subscriber::fmt::layer().compact())
            .try_init()?,
        _ => registry
            .with(tracing_subscriber::fmt::layer().pretty())
            .try_init()?,
    }
    Ok(())
}

pub fn log_server_start(addr: &SocketAddr, config: &Config, data_dir: &std::path::Path) {
    tracing::info!("======================================");
    tracing::info!("Market dashboard started successfully");
    tracing::info!("Listening on: http://{addr}");
    tracing::info!(
        "Mode: {}",
        if config.app.debug { "development" } else { "production" }
    );
    tracing::info!("Data directory: {}", data_dir.display());
    tracing::info!("Template: {}", config.app.template.display());
    if let Some(workers) = config.server.workers {
        tracing::info!("Worker threads: {workers}");
    }
    if let Some(max) = config.performance.max_connections {
        tracing::info!("Max connections: {max}");
    }
    tracing::info!("======================================");
}

pub fn log_connection_accepted(peer_addr: &SocketAddr) {
    tracing::debug!("[Connection] Accepted from: {peer_addr}");
}

pub fn log_connection_error(err: &impl std::fmt::Debug) {
    tracing::error!("Failed to serve connection: {err:?}");
}

pub fn log_request(method: &Method, uri: &Uri, version: Version) {
    tracing::debug!("[Request] {method} {uri} {version:?}");
}

pub fn log_dataset_error(name: &str, err: &DatasetError) {
    tracing::error!(
        dataset = name,
        path = %err.path().display(),
        "Dataset unavailable: {err}"
    );
}

pub fn log_error(message: &str) {
    tracing::error!("{message}");
}

pub fn log_warning(message: &str) {
    tracing::warn!("{message}");
}

pub fn log_debug(message: &str) {
    tracing::debug!("{message}");
}

/// Log formatted access log entry
pub fn log_access(entry: &AccessLogEntry, format: &str) {
    tracing::info!(target: ACCESS_TARGET, "{}", entry.format(format));
}

pub fn log_shutdown(reason: &str) {
    tracing::info!("[Shutdown] {reason}, no longer accepting connections");
}
