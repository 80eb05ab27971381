//! Concurrent kudos increments against SQLite.
//!
//! Many writers hitting the same and different counters at once must lose
//! no updates, and unknown workspaces must never gain counters.

use std::sync::Arc;

use futures::future::join_all;
use proptest::prelude::*;

use slack_kudos::adapters::SqliteStore;
use slack_kudos::config::DatabaseConfig;
use slack_kudos::domain::foundation::{TenantId, UserId};
use slack_kudos::domain::tenant::TenantCredentials;
use slack_kudos::ports::{CounterStore, CredentialStore};

async fn store() -> (tempfile::TempDir, Arc<SqliteStore>) {
    let dir = tempfile::tempdir().unwrap();
    let config = DatabaseConfig {
        url: format!("sqlite://{}", dir.path().join("counters.db").display()),
        max_connections: 5,
        acquire_timeout_secs: 30,
    };
    let store = SqliteStore::connect(&config).await.unwrap();
    (dir, Arc::new(store))
}

fn tenant(id: &str) -> TenantId {
    TenantId::new(id).unwrap()
}

fn user(id: &str) -> UserId {
    UserId::new(id).unwrap()
}

#[tokio::test]
async fn parallel_increments_across_users_lose_no_updates() {
    let (_dir, store) = store().await;
    store
        .save(&TenantCredentials::new(tenant("T1"), "Acme", "xoxb"))
        .await
        .unwrap();

    let users = ["UA", "UB", "UC"];
    let tasks = (0..60).map(|i| {
        let store = Arc::clone(&store);
        let who = user(users[i % users.len()]);
        tokio::spawn(async move { store.increment_or_create(&tenant("T1"), &who).await })
    });
    let results = join_all(tasks).await;
    assert!(results.into_iter().all(|r| r.unwrap().is_ok()));

    let top = store.top_n(&tenant("T1"), 10).await.unwrap();
    assert_eq!(top.len(), 3);
    assert!(top.iter().all(|entry| entry.count == 20));
    assert_eq!(top[0].user_id, user("UA"));
}

#[tokio::test]
async fn unknown_workspace_fails_closed_under_concurrency() {
    let (_dir, store) = store().await;

    let tasks = (0..10).map(|_| {
        let store = Arc::clone(&store);
        tokio::spawn(async move { store.increment_or_create(&tenant("TX"), &user("UA")).await })
    });
    for result in join_all(tasks).await {
        let err = result.unwrap().unwrap_err();
        assert!(err.is_unknown_tenant());
    }

    assert!(!store.workspace_exists(&tenant("TX")).await.unwrap());
    assert!(store.top_n(&tenant("TX"), 5).await.unwrap().is_empty());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn leaderboard_is_sorted_by_count_then_user(grants in prop::collection::vec(0usize..5, 1..40)) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async {
            let (_dir, store) = store().await;
            store
                .save(&TenantCredentials::new(tenant("T1"), "Acme", "xoxb"))
                .await
                .unwrap();

            for idx in &grants {
                store
                    .increment_or_create(&tenant("T1"), &user(&format!("U{}", idx)))
                    .await
                    .unwrap();
            }

            let top = store.top_n(&tenant("T1"), 10).await.unwrap();
            let total: u64 = top.iter().map(|entry| entry.count).sum();
            assert_eq!(total, grants.len() as u64);
            for pair in top.windows(2) {
                assert!(
                    pair[0].count > pair[1].count
                        || (pair[0].count == pair[1].count
                            && pair[0].user_id.as_str() < pair[1].user_id.as_str())
                );
            }
        });
    }
}
