//! Slack app configuration

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Bot scopes requested at install time.
pub const DEFAULT_SCOPES: &str =
    "channels:history,channels:read,chat:write,commands,groups:history,im:history,users:read";

/// Slack app configuration (OAuth client and Socket Mode)
#[derive(Debug, Clone, Deserialize)]
pub struct SlackConfig {
    /// OAuth client ID
    #[serde(default)]
    pub client_id: String,

    /// OAuth client secret
    pub client_secret: Option<SecretString>,

    /// App-level token used to open Socket Mode connections
    pub app_token: Option<SecretString>,

    /// OAuth redirect URI; derived from the server base URL when unset
    pub redirect_uri: Option<String>,

    /// Web API base URL
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Comma-separated bot scopes
    #[serde(default = "default_scopes")]
    pub scopes: String,

    /// Inbound envelope queue capacity per workspace
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,

    /// Seconds between credential refresh sweeps
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,
}

impl SlackConfig {
    /// Redirect URI registered with Slack for the install flow
    pub fn redirect_uri(&self, base_url: &str) -> String {
        self.redirect_uri
            .clone()
            .unwrap_or_else(|| format!("{}/oauth/callback", base_url.trim_end_matches('/')))
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    /// Validate Slack configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.client_id.trim().is_empty() {
            return Err(ValidationError::MissingRequired("SLACK__CLIENT_ID"));
        }
        match &self.client_secret {
            Some(secret) if !secret.expose_secret().trim().is_empty() => {}
            _ => return Err(ValidationError::MissingRequired("SLACK__CLIENT_SECRET")),
        }
        match &self.app_token {
            Some(token) if !token.expose_secret().trim().is_empty() => {
                if !token.expose_secret().starts_with("xapp-") {
                    return Err(ValidationError::InvalidAppToken);
                }
            }
            _ => return Err(ValidationError::MissingRequired("SLACK__APP_TOKEN")),
        }
        if !(1..=10_000).contains(&self.event_buffer) {
            return Err(ValidationError::InvalidEventBuffer);
        }
        if self.refresh_interval_secs < 60 {
            return Err(ValidationError::InvalidRefreshInterval);
        }
        Ok(())
    }
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: None,
            app_token: None,
            redirect_uri: None,
            api_base_url: default_api_base_url(),
            scopes: default_scopes(),
            event_buffer: default_event_buffer(),
            refresh_interval_secs: default_refresh_interval(),
        }
    }
}

fn default_api_base_url() -> String {
    "https://slack.com/api".to_string()
}

fn default_scopes() -> String {
    DEFAULT_SCOPES.to_string()
}

fn default_event_buffer() -> usize {
    64
}

fn default_refresh_interval() -> u64 {
    900
}
