//! Counter store port.
//!
//! Per-tenant, per-user kudos counters.
//!
//! # Atomicity
//!
//! [`CounterStore::increment_or_create`] must be a single atomic step
//! (insert with count 1, or add 1 to the existing row). Callers apply no
//! locking of their own, so concurrent increments for the same key from
//! different tenant pumps rely entirely on the store to never lose an update.
//!
//! # Referential integrity
//!
//! A counter may only exist for a tenant that has stored credentials.
//! Incrementing for an unknown tenant fails with `UnknownTenant` and
//! creates nothing.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, TenantId, UserId};
use crate::domain::kudos::KudosCount;

#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Atomically adds one kudos and returns the new total.
    ///
    /// # Errors
    ///
    /// - `UnknownTenant` if the tenant has no credentials record
    /// - `DatabaseError` on persistence failure
    async fn increment_or_create(
        &self,
        tenant_id: &TenantId,
        user_id: &UserId,
    ) -> Result<u64, DomainError>;

    /// Highest counters first, at most `n` entries. Ties are ordered by user id.
    async fn top_n(&self, tenant_id: &TenantId, n: u32) -> Result<Vec<KudosCount>, DomainError>;

    /// True when the tenant has a credentials record.
    async fn workspace_exists(&self, tenant_id: &TenantId) -> Result<bool, DomainError>;
}
