//! SQLite implementation of CredentialStore and CounterStore.
//!
//! Provides persistent storage for workspace credentials and kudos counters
//! in a single database file.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

use crate::config::DatabaseConfig;
use crate::domain::foundation::{DomainError, ErrorCode, TenantId, Timestamp, UserId};
use crate::domain::kudos::KudosCount;
use crate::domain::tenant::{parse_scopes, TenantCredentials};
use crate::ports::{CounterStore, CredentialStore};

/// SQLite implementation of the storage ports.
///
/// Foreign keys are enforced on every connection, so a counter row can only
/// be created for a stored workspace.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Creates a store over an existing pool. Migrations are not run.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Opens (creating if missing) the database and applies migrations.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, DomainError> {
        let options = SqliteConnectOptions::from_str(&config.url)
            .map_err(|e| DomainError::database("Invalid database url", e))?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect_with(options)
            .await
            .map_err(|e| DomainError::database("Failed to open database", e))?;

        let store = Self::new(pool);
        store.migrate().await?;
        Ok(store)
    }

    /// Applies the embedded schema migrations.
    pub async fn migrate(&self) -> Result<(), DomainError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| DomainError::database("Failed to run migrations", e))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Database row representation of a workspace.
#[derive(Debug, sqlx::FromRow)]
struct WorkspaceRow {
    team_id: String,
    team_name: String,
    access_token: String,
    bot_user_id: Option<String>,
    scopes: String,
    expires_at: Option<DateTime<Utc>>,
    refresh_token: Option<String>,
    last_updated: DateTime<Utc>,
}

impl TryFrom<WorkspaceRow> for TenantCredentials {
    type Error = DomainError;

    fn try_from(row: WorkspaceRow) -> Result<Self, Self::Error> {
        let tenant_id = TenantId::new(row.team_id).map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Invalid team_id: {}", e))
        })?;

        // Older installs stored an empty string instead of NULL.
        let bot_user_id = row
            .bot_user_id
            .filter(|id| !id.trim().is_empty())
            .map(UserId::new)
            .transpose()
            .map_err(|e| {
                DomainError::new(ErrorCode::DatabaseError, format!("Invalid bot_user_id: {}", e))
            })?;

        Ok(TenantCredentials {
            tenant_id,
            team_name: row.team_name,
            access_token: SecretString::new(row.access_token),
            bot_user_id,
            scopes: parse_scopes(&row.scopes),
            expires_at: row.expires_at.map(Timestamp::from_datetime),
            refresh_token: row
                .refresh_token
                .filter(|t| !t.is_empty())
                .map(SecretString::new),
            last_updated: Timestamp::from_datetime(row.last_updated),
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct KudosRow {
    user_id: String,
    count: i64,
}

impl TryFrom<KudosRow> for KudosCount {
    type Error = DomainError;

    fn try_from(row: KudosRow) -> Result<Self, Self::Error> {
        let user_id = UserId::new(row.user_id).map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Invalid user_id: {}", e))
        })?;
        Ok(KudosCount::new(user_id, count_from_db(row.count)))
    }
}

fn count_from_db(count: i64) -> u64 {
    u64::try_from(count).unwrap_or(0)
}

fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            db_err.is_foreign_key_violation()
                || db_err.message().contains("FOREIGN KEY constraint failed")
        }
        _ => false,
    }
}

#[async_trait]
impl CredentialStore for SqliteStore {
    async fn save(&self, credentials: &TenantCredentials) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO workspaces (
                team_id, team_name, access_token, bot_user_id, scopes,
                expires_at, refresh_token, last_updated
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(team_id) DO UPDATE SET
                team_name = excluded.team_name,
                access_token = excluded.access_token,
                bot_user_id = excluded.bot_user_id,
                scopes = excluded.scopes,
                expires_at = excluded.expires_at,
                refresh_token = excluded.refresh_token,
                last_updated = excluded.last_updated
            "#,
        )
        .bind(credentials.tenant_id.as_str())
        .bind(&credentials.team_name)
        .bind(credentials.access_token.expose_secret())
        .bind(credentials.bot_user_id.as_ref().map(|id| id.as_str()))
        .bind(credentials.scopes_string())
        .bind(credentials.expires_at.map(|t| *t.as_datetime()))
        .bind(credentials.refresh_token.as_ref().map(|t| t.expose_secret().as_str()))
        .bind(*credentials.last_updated.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to save workspace", e))?;

        Ok(())
    }

    async fn get_one(&self, tenant_id: &TenantId) -> Result<TenantCredentials, DomainError> {
        let row: Option<WorkspaceRow> = sqlx::query_as(
            r#"
            SELECT team_id, team_name, access_token, bot_user_id, scopes,
                   expires_at, refresh_token, last_updated
            FROM workspaces
            WHERE team_id = ?
            "#,
        )
        .bind(tenant_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to load workspace", e))?;

        match row {
            Some(row) => row.try_into(),
            None => Err(DomainError::unknown_tenant(tenant_id)),
        }
    }

    async fn get_all(&self) -> Result<Vec<TenantCredentials>, DomainError> {
        let rows: Vec<WorkspaceRow> = sqlx::query_as(
            r#"
            SELECT team_id, team_name, access_token, bot_user_id, scopes,
                   expires_at, refresh_token, last_updated
            FROM workspaces
            ORDER BY team_id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to list workspaces", e))?;

        rows.into_iter().map(TenantCredentials::try_from).collect()
    }
}

#[async_trait]
impl CounterStore for SqliteStore {
    async fn increment_or_create(
        &self,
        tenant_id: &TenantId,
        user_id: &UserId,
    ) -> Result<u64, DomainError> {
        let result: Result<(i64,), sqlx::Error> = sqlx::query_as(
            r#"
            INSERT INTO workspace_kudos (team_id, user_id, count)
            VALUES (?, ?, 1)
            ON CONFLICT(team_id, user_id) DO UPDATE SET count = count + 1
            RETURNING count
            "#,
        )
        .bind(tenant_id.as_str())
        .bind(user_id.as_str())
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok((count,)) => Ok(count_from_db(count)),
            Err(e) if is_foreign_key_violation(&e) => Err(DomainError::unknown_tenant(tenant_id)),
            Err(e) => Err(DomainError::database("Failed to increment kudos", e)
                .with_detail("tenant_id", tenant_id.as_str())),
        }
    }

    async fn top_n(&self, tenant_id: &TenantId, n: u32) -> Result<Vec<KudosCount>, DomainError> {
        let rows: Vec<KudosRow> = sqlx::query_as(
            r#"
            SELECT user_id, count
            FROM workspace_kudos
            WHERE team_id = ?
            ORDER BY count DESC, user_id ASC
            LIMIT ?
            "#,
        )
        .bind(tenant_id.as_str())
        .bind(i64::from(n))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to load leaderboard", e))?;

        rows.into_iter().map(KudosCount::try_from).collect()
    }

    async fn workspace_exists(&self, tenant_id: &TenantId) -> Result<bool, DomainError> {
        let (exists,): (i64,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM workspaces WHERE team_id = ?)")
                .bind(tenant_id.as_str())
                .fetch_one(&self.pool)
                .await
                .map_err(|e| DomainError::database("Failed to check workspace", e))?;
        Ok(exists != 0)
    }
}
