//! Stored credentials of one installed workspace.

use std::collections::BTreeSet;

use chrono::Duration;
use secrecy::{ExposeSecret, SecretString};

use crate::domain::foundation::{TenantId, Timestamp, UserId, ValidationError};

/// Tokens expiring within this window are refreshed before use.
pub const REFRESH_WINDOW_SECS: i64 = 60 * 60;

/// Credentials of one installed workspace.
///
/// Always read and written as a whole record; a second save for the same
/// tenant replaces the first.
#[derive(Debug, Clone)]
pub struct TenantCredentials {
    pub tenant_id: TenantId,
    pub team_name: String,
    pub access_token: SecretString,
    pub bot_user_id: Option<UserId>,
    pub scopes: BTreeSet<String>,
    pub expires_at: Option<Timestamp>,
    pub refresh_token: Option<SecretString>,
    pub last_updated: Timestamp,
}

impl TenantCredentials {
    /// Creates credentials for a non-expiring bot token.
    pub fn new(
        tenant_id: TenantId,
        team_name: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Self {
        Self {
            tenant_id,
            team_name: team_name.into(),
            access_token: SecretString::new(access_token.into()),
            bot_user_id: None,
            scopes: BTreeSet::new(),
            expires_at: None,
            refresh_token: None,
            last_updated: Timestamp::now(),
        }
    }

    pub fn with_bot_user(mut self, bot_user_id: UserId) -> Self {
        self.bot_user_id = Some(bot_user_id);
        self
    }

    /// Sets the granted scopes from Slack's comma-separated form.
    pub fn with_scopes(mut self, scopes: &str) -> Self {
        self.scopes = parse_scopes(scopes);
        self
    }

    /// Marks the token as rotating: it expires at `expires_at` and can be
    /// renewed with `refresh_token`.
    pub fn with_expiry(mut self, expires_at: Timestamp, refresh_token: impl Into<String>) -> Self {
        self.expires_at = Some(expires_at);
        self.refresh_token = Some(SecretString::new(refresh_token.into()));
        self
    }

    pub fn with_last_updated(mut self, last_updated: Timestamp) -> Self {
        self.last_updated = last_updated;
        self
    }

    pub fn has_access_token(&self) -> bool {
        !self.access_token.expose_secret().trim().is_empty()
    }

    /// Checks the record can be used to open a connection.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.has_access_token() {
            return Err(ValidationError::empty_field("access_token"));
        }
        Ok(())
    }

    /// True when the token expires within [`REFRESH_WINDOW_SECS`] of `now`.
    ///
    /// Records without an expiry never need a refresh.
    pub fn needs_refresh(&self, now: Timestamp) -> bool {
        match &self.expires_at {
            Some(expires_at) => {
                expires_at.duration_since(&now) <= Duration::seconds(REFRESH_WINDOW_SECS)
            }
            None => false,
        }
    }

    /// Applies a token refresh. A missing `refresh_token` keeps the current one.
    /// An `expires_in_secs` out of the representable range leaves no expiry.
    pub fn refreshed(
        mut self,
        access_token: SecretString,
        refresh_token: Option<SecretString>,
        expires_in_secs: i64,
        now: Timestamp,
    ) -> Self {
        self.access_token = access_token;
        self.expires_at = now.checked_plus_secs(expires_in_secs);
        if let Some(token) = refresh_token {
            self.refresh_token = Some(token);
        }
        self.last_updated = now;
        self
    }

    /// Scopes in Slack's comma-separated form.
    pub fn scopes_string(&self) -> String {
        self.scopes.iter().cloned().collect::<Vec<_>>().join(",")
    }
}

/// Splits a comma-separated scope list, dropping blanks and duplicates.
pub fn parse_scopes(scopes: &str) -> BTreeSet<String> {
    scopes
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Who the bot is inside one workspace, as reported by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotIdentity {
    pub tenant_id: TenantId,
    pub bot_user_id: UserId,
    pub bot_name: String,
}
