//! SlackWebApi - ChatApi over the Slack Web API with one bot token.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{TenantId, UserId};
use crate::domain::tenant::BotIdentity;
use crate::ports::{ChatApi, TransportError};

use super::api::{read_response, Empty};

#[derive(Debug, Serialize)]
struct PostMessageRequest<'a> {
    channel: &'a str,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct AuthTestBody {
    user_id: String,
    #[serde(default)]
    user: String,
}

/// Chat client bound to one workspace's bot token.
pub struct SlackWebApi {
    client: Client,
    base_url: String,
    tenant_id: TenantId,
    token: SecretString,
}

impl SlackWebApi {
    pub fn new(
        client: Client,
        base_url: impl Into<String>,
        tenant_id: TenantId,
        token: SecretString,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            tenant_id,
            token,
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/{}", self.base_url, method)
    }
}

#[async_trait]
impl ChatApi for SlackWebApi {
    async fn send_text(&self, channel: &str, text: &str) -> Result<(), TransportError> {
        let response = self
            .client
            .post(self.method_url("chat.postMessage"))
            .bearer_auth(self.token.expose_secret())
            .json(&PostMessageRequest { channel, text })
            .send()
            .await
            .map_err(|e| TransportError::Http(e.to_string()))?;

        read_response::<Empty>(response).await?;
        Ok(())
    }

    async fn who_am_i(&self) -> Result<BotIdentity, TransportError> {
        let response = self
            .client
            .post(self.method_url("auth.test"))
            .bearer_auth(self.token.expose_secret())
            .send()
            .await
            .map_err(|e| TransportError::Http(e.to_string()))?;

        let body: AuthTestBody = read_response(response).await?;
        let bot_user_id = UserId::new(body.user_id)
            .map_err(|e| TransportError::InvalidResponse(e.to_string()))?;

        Ok(BotIdentity {
            tenant_id: self.tenant_id.clone(),
            bot_user_id,
            bot_name: body.user,
        })
    }
}
