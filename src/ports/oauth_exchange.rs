//! OAuth exchange port.
//!
//! Turns an authorization code into workspace credentials and renews
//! rotating tokens. The protocol details live in the adapter.

use async_trait::async_trait;
use secrecy::SecretString;

use crate::domain::foundation::{DomainError, TenantId, Timestamp, UserId};
use crate::domain::tenant::{parse_scopes, TenantCredentials};

/// Result of a successful authorization-code exchange.
#[derive(Debug, Clone)]
pub struct OAuthGrant {
    pub tenant_id: TenantId,
    pub team_name: String,
    pub access_token: SecretString,
    pub bot_user_id: Option<UserId>,
    pub scopes: String,
    pub refresh_token: Option<SecretString>,
    pub expires_in_secs: Option<i64>,
}

impl OAuthGrant {
    /// Builds the record to persist. Expiry is tracked only for rotating
    /// tokens, i.e. when a refresh token was granted, and only when
    /// `expires_in_secs` lands in the representable range.
    pub fn into_credentials(self, now: Timestamp) -> TenantCredentials {
        let expires_at = match (&self.refresh_token, self.expires_in_secs) {
            (Some(_), Some(secs)) => now.checked_plus_secs(secs),
            _ => None,
        };

        TenantCredentials {
            tenant_id: self.tenant_id,
            team_name: self.team_name,
            access_token: self.access_token,
            bot_user_id: self.bot_user_id,
            scopes: parse_scopes(&self.scopes),
            expires_at,
            refresh_token: self.refresh_token,
            last_updated: now,
        }
    }
}

/// Result of renewing a rotating token.
#[derive(Debug, Clone)]
pub struct TokenRefresh {
    pub access_token: SecretString,
    /// Present when the provider rotated the refresh token too.
    pub refresh_token: Option<SecretString>,
    pub expires_in_secs: i64,
}

#[async_trait]
pub trait OAuthExchange: Send + Sync {
    /// Exchanges an authorization code from the install redirect.
    ///
    /// # Errors
    ///
    /// - `OAuthExchangeFailed` when the provider rejects the code
    async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<OAuthGrant, DomainError>;

    /// Renews a rotating access token.
    ///
    /// # Errors
    ///
    /// - `TokenRefreshFailed` when the provider rejects the refresh token
    async fn refresh(&self, refresh_token: &SecretString) -> Result<TokenRefresh, DomainError>;
}
