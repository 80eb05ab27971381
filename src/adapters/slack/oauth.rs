//! SlackOAuthClient - OAuthExchange over `oauth.v2.access`.
//!
//! The same method serves the install-time code exchange and, for apps with
//! token rotation enabled, `grant_type=refresh_token`.

use async_trait::async_trait;
use reqwest::{Client, Url};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::domain::foundation::{DomainError, ErrorCode, TenantId, UserId};
use crate::ports::{OAuthExchange, OAuthGrant, TokenRefresh, TransportError};

use super::api::read_response;

/// Where users are sent to approve an install.
pub const SLACK_AUTHORIZE_URL: &str = "https://slack.com/oauth/v2/authorize";

/// Builds the authorize link for the "Add to Slack" flow.
pub fn authorize_url(client_id: &str, scopes: &str, redirect_uri: &str) -> Result<String, DomainError> {
    Url::parse_with_params(
        SLACK_AUTHORIZE_URL,
        &[
            ("client_id", client_id),
            ("scope", scopes),
            ("redirect_uri", redirect_uri),
        ],
    )
    .map(String::from)
    .map_err(|e| DomainError::new(ErrorCode::InternalError, format!("Invalid authorize URL: {}", e)))
}

#[derive(Debug, Deserialize)]
struct TeamInfo {
    id: String,
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct AccessBody {
    access_token: String,
    #[serde(default)]
    scope: String,
    #[serde(default)]
    bot_user_id: Option<String>,
    #[serde(default)]
    team: Option<TeamInfo>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

impl AccessBody {
    fn into_grant(self) -> Result<OAuthGrant, DomainError> {
        let team = self.team.ok_or_else(|| {
            DomainError::new(ErrorCode::OAuthExchangeFailed, "Response has no team")
        })?;
        let tenant_id = TenantId::new(team.id)?;
        let bot_user_id = self
            .bot_user_id
            .filter(|id| !id.is_empty())
            .map(UserId::new)
            .transpose()?;

        Ok(OAuthGrant {
            tenant_id,
            team_name: team.name,
            access_token: SecretString::new(self.access_token),
            bot_user_id,
            scopes: self.scope,
            refresh_token: self.refresh_token.map(SecretString::new),
            expires_in_secs: self.expires_in,
        })
    }
}

/// OAuth v2 client for one Slack app.
pub struct SlackOAuthClient {
    client: Client,
    base_url: String,
    client_id: String,
    client_secret: SecretString,
}

impl SlackOAuthClient {
    pub fn new(
        client: Client,
        base_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: SecretString,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client_id: client_id.into(),
            client_secret,
        }
    }

    async fn access(&self, form: &[(&str, &str)]) -> Result<AccessBody, TransportError> {
        let response = self
            .client
            .post(format!("{}/oauth.v2.access", self.base_url))
            .basic_auth(&self.client_id, Some(self.client_secret.expose_secret()))
            .form(form)
            .send()
            .await
            .map_err(|e| TransportError::Http(e.to_string()))?;

        read_response(response).await
    }
}

#[async_trait]
impl OAuthExchange for SlackOAuthClient {
    async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<OAuthGrant, DomainError> {
        let body = self
            .access(&[("code", code), ("redirect_uri", redirect_uri)])
            .await
            .map_err(|e| {
                DomainError::new(ErrorCode::OAuthExchangeFailed, format!("Code exchange failed: {}", e))
            })?;

        body.into_grant()
    }

    async fn refresh(&self, refresh_token: &SecretString) -> Result<TokenRefresh, DomainError> {
        let body = self
            .access(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token.expose_secret()),
            ])
            .await
            .map_err(|e| {
                DomainError::new(ErrorCode::TokenRefreshFailed, format!("Token refresh failed: {}", e))
            })?;

        Ok(TokenRefresh {
            access_token: SecretString::new(body.access_token),
            refresh_token: body.refresh_token.map(SecretString::new),
            expires_in_secs: body.expires_in.unwrap_or(0),
        })
    }
}
