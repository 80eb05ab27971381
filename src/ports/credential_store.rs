//! Credential store port.
//!
//! Persists [`TenantCredentials`] as whole records. Saving a record for a
//! tenant that already has one replaces it.
//!
//! # Example
//!
//! ```ignore
//! async fn reinstall(store: &dyn CredentialStore, creds: TenantCredentials) -> Result<(), DomainError> {
//!     store.save(&creds).await?;
//!     let stored = store.get_one(&creds.tenant_id).await?;
//!     assert_eq!(stored.team_name, creds.team_name);
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, TenantId};
use crate::domain::tenant::TenantCredentials;

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Inserts or replaces the record for `credentials.tenant_id`.
    ///
    /// # Errors
    ///
    /// - `DatabaseError` on persistence failure
    async fn save(&self, credentials: &TenantCredentials) -> Result<(), DomainError>;

    /// Loads one record.
    ///
    /// # Errors
    ///
    /// - `UnknownTenant` if the workspace was never installed
    /// - `DatabaseError` on persistence failure
    async fn get_one(&self, tenant_id: &TenantId) -> Result<TenantCredentials, DomainError>;

    /// Loads every stored record, ordered by tenant id.
    async fn get_all(&self) -> Result<Vec<TenantCredentials>, DomainError>;
}
