//! In-memory credential and counter store.
//!
//! Implements both storage ports over one `tokio::sync::RwLock`, so the
//! tenant check and the increment happen under the same write guard. Used by
//! tests and for running without a database file.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, TenantId, UserId};
use crate::domain::kudos::KudosCount;
use crate::domain::tenant::TenantCredentials;
use crate::ports::{CounterStore, CredentialStore};

#[derive(Default)]
struct State {
    workspaces: BTreeMap<TenantId, TenantCredentials>,
    counters: HashMap<(TenantId, UserId), u64>,
}

/// Volatile implementation of [`CredentialStore`] and [`CounterStore`].
///
/// # Example
///
/// ```ignore
/// let store = Arc::new(InMemoryStore::new());
/// store.save(&creds).await?;
/// assert_eq!(store.increment_or_create(&creds.tenant_id, &user).await?, 1);
/// ```
#[derive(Default)]
pub struct InMemoryStore {
    state: RwLock<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // === Test Helpers ===

    /// Current counter value, `None` when no row exists.
    pub async fn counter(&self, tenant_id: &TenantId, user_id: &UserId) -> Option<u64> {
        self.state
            .read()
            .await
            .counters
            .get(&(tenant_id.clone(), user_id.clone()))
            .copied()
    }

    /// Number of counter rows across all tenants.
    pub async fn counter_rows(&self) -> usize {
        self.state.read().await.counters.len()
    }
}

#[async_trait]
impl CredentialStore for InMemoryStore {
    async fn save(&self, credentials: &TenantCredentials) -> Result<(), DomainError> {
        self.state
            .write()
            .await
            .workspaces
            .insert(credentials.tenant_id.clone(), credentials.clone());
        Ok(())
    }

    async fn get_one(&self, tenant_id: &TenantId) -> Result<TenantCredentials, DomainError> {
        self.state
            .read()
            .await
            .workspaces
            .get(tenant_id)
            .cloned()
            .ok_or_else(|| DomainError::unknown_tenant(tenant_id))
    }

    async fn get_all(&self) -> Result<Vec<TenantCredentials>, DomainError> {
        Ok(self.state.read().await.workspaces.values().cloned().collect())
    }
}

#[async_trait]
impl CounterStore for InMemoryStore {
    async fn increment_or_create(
        &self,
        tenant_id: &TenantId,
        user_id: &UserId,
    ) -> Result<u64, DomainError> {
        let mut state = self.state.write().await;
        if !state.workspaces.contains_key(tenant_id) {
            return Err(DomainError::unknown_tenant(tenant_id));
        }

        let count = state
            .counters
            .entry((tenant_id.clone(), user_id.clone()))
            .or_insert(0);
        *count += 1;
        Ok(*count)
    }

    async fn top_n(&self, tenant_id: &TenantId, n: u32) -> Result<Vec<KudosCount>, DomainError> {
        let state = self.state.read().await;
        let mut entries: Vec<KudosCount> = state
            .counters
            .iter()
            .filter(|((tenant, _), _)| tenant == tenant_id)
            .map(|((_, user), count)| KudosCount::new(user.clone(), *count))
            .collect();

        entries.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.user_id.cmp(&b.user_id)));
        entries.truncate(n as usize);
        Ok(entries)
    }

    async fn workspace_exists(&self, tenant_id: &TenantId) -> Result<bool, DomainError> {
        Ok(self.state.read().await.workspaces.contains_key(tenant_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn tenant(id: &str) -> TenantId {
        TenantId::new(id).unwrap()
    }

    fn user(id: &str) -> UserId {
        UserId::new(id).unwrap()
    }

    async fn store_with(tenant_id: &str) -> InMemoryStore {
        let store = InMemoryStore::new();
        store
            .save(&TenantCredentials::new(tenant(tenant_id), "Acme", "xoxb-1"))
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn save_replaces_existing_record() {
        let store = store_with("T1").await;
        store
            .save(&TenantCredentials::new(tenant("T1"), "Acme Renamed", "xoxb-2"))
            .await
            .unwrap();

        let all = store.get_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].team_name, "Acme Renamed");
    }

    #[tokio::test]
    async fn get_one_for_unknown_tenant_fails() {
        let store = InMemoryStore::new();
        let err = store.get_one(&tenant("T404")).await.unwrap_err();
        assert!(err.is_unknown_tenant());
    }

    #[tokio::test]
    async fn increment_creates_then_increments() {
        let store = store_with("T1").await;
        assert_eq!(store.increment_or_create(&tenant("T1"), &user("U1")).await.unwrap(), 1);
        assert_eq!(store.increment_or_create(&tenant("T1"), &user("U1")).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn increment_for_unknown_tenant_creates_nothing() {
        let store = InMemoryStore::new();
        let err = store
            .increment_or_create(&tenant("T404"), &user("U1"))
            .await
            .unwrap_err();

        assert!(err.is_unknown_tenant());
        assert_eq!(store.counter_rows().await, 0);
    }

    #[tokio::test]
    async fn concurrent_increments_are_not_lost() {
        let store = Arc::new(store_with("T1").await);
        let mut tasks = Vec::new();
        for _ in 0..50 {
            let store = Arc::clone(&store);
            tasks.push(tokio::spawn(async move {
                store.increment_or_create(&tenant("T1"), &user("U1")).await
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(store.counter(&tenant("T1"), &user("U1")).await, Some(50));
    }

    #[tokio::test]
    async fn top_n_is_scoped_sorted_and_truncated() {
        let store = store_with("T1").await;
        store
            .save(&TenantCredentials::new(tenant("T2"), "Other", "xoxb-9"))
            .await
            .unwrap();

        for (who, times) in [("A", 5), ("B", 3), ("C", 1), ("D", 3)] {
            for _ in 0..times {
                store.increment_or_create(&tenant("T1"), &user(who)).await.unwrap();
            }
        }
        store.increment_or_create(&tenant("T2"), &user("Z")).await.unwrap();

        let top = store.top_n(&tenant("T1"), 3).await.unwrap();
        let names: Vec<_> = top.iter().map(|e| e.user_id.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "D"]);
    }

    #[tokio::test]
    async fn workspace_exists_reflects_saved_records() {
        let store = store_with("T1").await;
        assert!(store.workspace_exists(&tenant("T1")).await.unwrap());
        assert!(!store.workspace_exists(&tenant("T2")).await.unwrap());
    }
}
