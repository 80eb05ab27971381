//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid port number")]
    InvalidPort,

    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(String),

    #[error("Invalid log format '{0}' (expected 'pretty' or 'json')")]
    InvalidLogFormat(String),

    #[error("Shutdown grace period must be between 1 and 60 seconds")]
    InvalidShutdownGrace,

    #[error("Invalid database URL format")]
    InvalidDatabaseUrl,

    #[error("Pool size must be between 1 and 50")]
    InvalidPoolSize,

    #[error("Invalid acquire timeout")]
    InvalidTimeout,

    #[error("Slack app token must start with 'xapp-'")]
    InvalidAppToken,

    #[error("Event buffer must be between 1 and 10000")]
    InvalidEventBuffer,

    #[error("Refresh interval must be at least 60 seconds")]
    InvalidRefreshInterval,
}
