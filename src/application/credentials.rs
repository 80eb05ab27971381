//! CredentialRefresher - keeps rotating bot tokens from expiring.
//!
//! Workspaces that opted into token rotation store an expiry and a refresh
//! token. Before a token is used (at startup) and periodically afterwards,
//! records expiring within the refresh window are exchanged for new tokens
//! and saved back as a whole record.
//!
//! ## Periodic Sweep
//!
//! | Setting | Default | Description |
//! |---------|---------|-------------|
//! | `interval` | 900s | Time between sweeps over all stored workspaces |
//!
//! A refreshed record for a live workspace is handed to
//! [`TenantManager::refresh_tenant`], which swaps the API handle in place.
//! The sweep never starts a connection.

use std::sync::Arc;
use std::time::Duration;

use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::application::tenants::TenantManager;
use crate::domain::foundation::{DomainError, ErrorCode, TenantId, Timestamp};
use crate::domain::tenant::TenantCredentials;
use crate::ports::{CredentialStore, OAuthExchange};

/// Result of a refresh check.
#[derive(Debug, Clone)]
pub enum RefreshOutcome {
    /// No expiry, or the expiry is outside the refresh window.
    NotNeeded,
    /// New tokens were obtained and saved.
    Refreshed(TenantCredentials),
}

impl RefreshOutcome {
    pub fn is_refreshed(&self) -> bool {
        matches!(self, RefreshOutcome::Refreshed(_))
    }
}

/// Summary of one sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub checked: usize,
    pub refreshed: usize,
    pub failed: usize,
}

pub struct CredentialRefresher {
    store: Arc<dyn CredentialStore>,
    oauth: Arc<dyn OAuthExchange>,
}

impl CredentialRefresher {
    pub fn new(store: Arc<dyn CredentialStore>, oauth: Arc<dyn OAuthExchange>) -> Self {
        Self { store, oauth }
    }

    /// Refreshes one workspace's token if it expires within the window.
    ///
    /// # Errors
    ///
    /// - `UnknownTenant` when no record is stored
    /// - `TokenRefreshFailed` when the exchange is rejected
    pub async fn refresh_if_needed(&self, tenant_id: &TenantId) -> Result<RefreshOutcome, DomainError> {
        let credentials = self.store.get_one(tenant_id).await?;
        self.refresh_credentials(credentials, Timestamp::now()).await
    }

    /// Same as [`refresh_if_needed`](Self::refresh_if_needed) for a record
    /// already in hand, evaluated at `now`.
    pub async fn refresh_credentials(
        &self,
        credentials: TenantCredentials,
        now: Timestamp,
    ) -> Result<RefreshOutcome, DomainError> {
        if !credentials.needs_refresh(now) {
            return Ok(RefreshOutcome::NotNeeded);
        }

        let refresh_token = credentials.refresh_token.clone().ok_or_else(|| {
            DomainError::new(ErrorCode::TokenRefreshFailed, "No refresh token stored")
                .with_detail("tenant_id", credentials.tenant_id.as_str())
        })?;

        let tenant_id = credentials.tenant_id.clone();
        let grant = self
            .oauth
            .refresh(&refresh_token)
            .await
            .map_err(|e| e.with_detail("tenant_id", tenant_id.as_str()))?;

        let updated = credentials.refreshed(
            grant.access_token,
            grant.refresh_token,
            grant.expires_in_secs,
            now,
        );
        self.store.save(&updated).await?;

        tracing::info!(
            tenant_id = %tenant_id,
            expires_at = ?updated.expires_at,
            "Refreshed access token"
        );
        Ok(RefreshOutcome::Refreshed(updated))
    }

    /// Checks every stored workspace once.
    pub async fn sweep(&self, manager: &TenantManager) -> Result<SweepReport, DomainError> {
        let all = self.store.get_all().await?;
        let now = Timestamp::now();
        let mut report = SweepReport {
            checked: all.len(),
            ..SweepReport::default()
        };

        for credentials in all {
            let tenant_id = credentials.tenant_id.clone();
            match self.refresh_credentials(credentials, now).await {
                Ok(RefreshOutcome::Refreshed(updated)) => {
                    report.refreshed += 1;
                    // Stopped or removed workspaces pick the record up when re-added.
                    if let Err(e) = manager.refresh_tenant(&updated).await {
                        tracing::warn!(
                            tenant_id = %tenant_id,
                            error = %e,
                            "Failed to apply refreshed credentials"
                        );
                    }
                }
                Ok(RefreshOutcome::NotNeeded) => {}
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(tenant_id = %tenant_id, error = %e, "Token refresh failed");
                }
            }
        }

        Ok(report)
    }

    /// Sweeps every `interval` until `cancel` fires.
    pub async fn run(&self, manager: Arc<TenantManager>, interval: Duration, cancel: CancellationToken) {
        let mut ticker = time::interval(interval);
        ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
        // The first tick completes immediately; startup already refreshed.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!("Credential refresher stopped");
                    return;
                }
                _ = ticker.tick() => {
                    match self.sweep(&manager).await {
                        Ok(report) if report.refreshed > 0 || report.failed > 0 => {
                            tracing::info!(
                                checked = report.checked,
                                refreshed = report.refreshed,
                                failed = report.failed,
                                "Credential sweep finished"
                            );
                        }
                        Ok(_) => {}
                        Err(e) => tracing::warn!(error = %e, "Credential sweep failed"),
                    }
                }
            }
        }
    }
}
