//! Error types for the gatekeeper process.
//!
//! Request-path failures never reach this type: quota rejections and store
//! outages are turned into responses by the middleware.

use thiserror::Error;

use crate::config::ConfigError;

/// Fatal startup and serving errors.
#[derive(Error, Debug)]
pub enum GatekeeperError {
    /// Missing or malformed configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The store URL was accepted by validation but rejected by the client
    #[error("Invalid counter store URL: {0}")]
    StoreUrl(#[from] redis::RedisError),

    #[error("Logging setup failed: {0}")]
    Logging(#[from] tracing_subscriber::util::TryInitError),

    #[error("Metrics exporter setup failed: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    /// I/O errors (bind, accept)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for gatekeeper operations.
pub type Result<T> = std::result::Result<T, GatekeeperError>;
