//! SlackTransportFactory - builds per-workspace Slack transport objects.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use secrecy::SecretString;

use crate::domain::tenant::TenantCredentials;
use crate::ports::{ChatApi, EventStream, TransportError, TransportFactory};

use super::{SlackWebApi, SocketModeStream};

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Builds Socket Mode streams and Web API clients sharing one HTTP client.
pub struct SlackTransportFactory {
    client: Client,
    api_base_url: String,
    app_token: SecretString,
}

impl SlackTransportFactory {
    pub fn new(api_base_url: impl Into<String>, app_token: SecretString) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| TransportError::Http(e.to_string()))?;
        Ok(Self::with_client(client, api_base_url, app_token))
    }

    pub fn with_client(client: Client, api_base_url: impl Into<String>, app_token: SecretString) -> Self {
        Self {
            client,
            api_base_url: api_base_url.into(),
            app_token,
        }
    }

    /// The shared HTTP client, for other Slack adapters.
    pub fn client(&self) -> Client {
        self.client.clone()
    }
}

impl TransportFactory for SlackTransportFactory {
    fn event_stream(
        &self,
        credentials: &TenantCredentials,
    ) -> Result<Arc<dyn EventStream>, TransportError> {
        Ok(Arc::new(SocketModeStream::new(
            self.client.clone(),
            self.api_base_url.clone(),
            self.app_token.clone(),
            credentials.tenant_id.clone(),
        )))
    }

    fn chat_api(&self, credentials: &TenantCredentials) -> Result<Arc<dyn ChatApi>, TransportError> {
        Ok(Arc::new(SlackWebApi::new(
            self.client.clone(),
            self.api_base_url.clone(),
            credentials.tenant_id.clone(),
            credentials.access_token.clone(),
        )))
    }
}
