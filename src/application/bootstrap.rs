//! Startup: bring every stored workspace online.

use crate::application::credentials::{CredentialRefresher, RefreshOutcome};
use crate::application::tenants::TenantManager;
use crate::domain::foundation::{DomainError, TenantId};
use crate::ports::CredentialStore;

/// What happened to the stored workspaces at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BootstrapReport {
    /// Records read from the credential store
    pub loaded: usize,
    /// Workspaces whose connection was started
    pub started: usize,
    /// Workspaces left offline, in load order
    pub skipped: Vec<TenantId>,
}

/// Loads every stored workspace and adds it to `manager`.
///
/// A workspace that cannot be brought up is logged and skipped; only a
/// failure to list the store is returned.
pub async fn bootstrap_tenants(
    store: &dyn CredentialStore,
    refresher: &CredentialRefresher,
    manager: &TenantManager,
) -> Result<BootstrapReport, DomainError> {
    let all = store.get_all().await?;
    let mut report = BootstrapReport {
        loaded: all.len(),
        ..BootstrapReport::default()
    };

    for stored in all {
        let tenant_id = stored.tenant_id.clone();

        if !stored.has_access_token() {
            tracing::warn!(tenant_id = %tenant_id, "Skipping workspace without access token");
            report.skipped.push(tenant_id);
            continue;
        }

        let credentials = match refresher.refresh_if_needed(&tenant_id).await {
            Ok(RefreshOutcome::Refreshed(updated)) => updated,
            Ok(RefreshOutcome::NotNeeded) => stored,
            Err(e) => {
                tracing::warn!(tenant_id = %tenant_id, error = %e, "Skipping workspace, token refresh failed");
                report.skipped.push(tenant_id);
                continue;
            }
        };

        if let Err(e) = manager.add_tenant(&credentials).await {
            tracing::error!(tenant_id = %tenant_id, error = %e, "Failed to start workspace");
            report.skipped.push(tenant_id);
            continue;
        }
        report.started += 1;

        let Some(connection) = manager.get_tenant(&tenant_id).await else {
            continue;
        };
        match connection.who_am_i().await {
            Ok(identity) => tracing::info!(
                tenant_id = %tenant_id,
                team_name = %credentials.team_name,
                bot_user_id = %identity.bot_user_id,
                bot_name = %identity.bot_name,
                "Workspace online"
            ),
            Err(e) => tracing::warn!(tenant_id = %tenant_id, error = %e, "Could not fetch bot identity"),
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{InMemoryStore, InMemoryTransport};
    use crate::application::handlers::kudos_router;
    use crate::application::tenants::TenantManagerConfig;
    use crate::domain::foundation::{ErrorCode, Timestamp};
    use crate::domain::tenant::{ConnectionStatus, TenantCredentials};
    use crate::ports::{OAuthExchange, OAuthGrant, TokenRefresh};
    use async_trait::async_trait;
    use secrecy::SecretString;
    use std::sync::Arc;

    struct RejectingOAuth;

    #[async_trait]
    impl OAuthExchange for RejectingOAuth {
        async fn exchange_code(&self, _code: &str, _uri: &str) -> Result<OAuthGrant, DomainError> {
            Err(DomainError::new(ErrorCode::OAuthExchangeFailed, "not used"))
        }

        async fn refresh(&self, _token: &SecretString) -> Result<TokenRefresh, DomainError> {
            Err(DomainError::new(ErrorCode::TokenRefreshFailed, "invalid_refresh_token"))
        }
    }

    fn creds(tenant: &str, token: &str) -> TenantCredentials {
        TenantCredentials::new(TenantId::new(tenant).unwrap(), format!("Team {}", tenant), token)
    }

    #[tokio::test]
    async fn starts_usable_workspaces_and_skips_the_rest() {
        let store = Arc::new(InMemoryStore::new());
        store.save(&creds("T1", "xoxb-1")).await.unwrap();
        store.save(&creds("T2", "")).await.unwrap();
        store
            .save(&creds("T3", "xoxb-3").with_expiry(Timestamp::now().plus_secs(60), "xoxe-3"))
            .await
            .unwrap();

        let refresher = CredentialRefresher::new(store.clone(), Arc::new(RejectingOAuth));
        let manager = TenantManager::new(
            Arc::new(InMemoryTransport::new()),
            Arc::new(kudos_router(store.clone())),
            TenantManagerConfig::default(),
        );

        let report = bootstrap_tenants(store.as_ref(), &refresher, &manager).await.unwrap();

        assert_eq!(report.loaded, 3);
        assert_eq!(report.started, 1);
        assert_eq!(
            report.skipped,
            vec![TenantId::new("T2").unwrap(), TenantId::new("T3").unwrap()]
        );
        assert_eq!(
            manager.status(&TenantId::new("T1").unwrap()).await,
            Some(ConnectionStatus::Running)
        );
        assert!(manager.get_tenant(&TenantId::new("T2").unwrap()).await.is_none());
    }

    #[tokio::test]
    async fn empty_store_starts_nothing() {
        let store = Arc::new(InMemoryStore::new());
        let refresher = CredentialRefresher::new(store.clone(), Arc::new(RejectingOAuth));
        let manager = TenantManager::new(
            Arc::new(InMemoryTransport::new()),
            Arc::new(kudos_router(store.clone())),
            TenantManagerConfig::default(),
        );

        let report = bootstrap_tenants(store.as_ref(), &refresher, &manager).await.unwrap();

        assert_eq!(report, BootstrapReport::default());
        assert!(manager.is_empty().await);
    }
}
