//! Application configuration module
//!
//! This module provides type-safe configuration loading from environment variables
//! using the `config` and `dotenvy` crates. Configuration is loaded with the
//! `KUDOS` prefix and nested values use double underscores as separators.
//!
//! # Example
//!
//! ```no_run
//! use slack_kudos::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Server running on {:?}", config.server.socket_addr());
//! ```

mod database;
mod error;
mod server;
mod slack;

pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use server::{LogFormat, ServerConfig};
pub use slack::{SlackConfig, DEFAULT_SCOPES};

use serde::Deserialize;

/// Root application configuration
///
/// Load using [`AppConfig::load()`] which reads from environment variables.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Server configuration (bind address, logging, shutdown)
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration (SQLite file)
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Slack app configuration (OAuth client, Socket Mode token)
    #[serde(default)]
    pub slack: SlackConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `KUDOS` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `KUDOS__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `KUDOS__SLACK__APP_TOKEN=xapp-...` -> `slack.app_token = ...`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if values cannot be parsed into expected types.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("KUDOS")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.database.validate()?;
        self.slack.validate()?;
        Ok(())
    }

    /// Redirect URI for the OAuth install flow
    pub fn redirect_uri(&self) -> String {
        self.slack.redirect_uri(self.server.base_url())
    }
}
