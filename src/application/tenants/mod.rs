//! Tenant lifecycle: per-workspace connections and the manager that owns them.

mod connection;
mod manager;

pub use connection::{ApiHandle, TenantConnection};
pub use manager::{
    AddOutcome, TenantError, TenantManager, TenantManagerConfig, DEFAULT_EVENT_BUFFER,
};
