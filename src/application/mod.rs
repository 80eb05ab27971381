//! Application layer - dispatch, tenant lifecycle, and credential upkeep.
//!
//! This layer orchestrates domain operations and coordinates between ports.
//!
//! ```text
//! EventStream ─► pump ─► EventRouter ─► ClassDispatcher ─► HandlerRegistry ─► EventHandler
//!                 ▲
//!          TenantManager (one entry per workspace)
//! ```

pub mod bootstrap;
pub mod credentials;
pub mod dispatch;
pub mod handlers;
pub mod registry;
pub mod tenants;

pub use bootstrap::{bootstrap_tenants, BootstrapReport};
pub use credentials::{CredentialRefresher, RefreshOutcome, SweepReport};
pub use dispatch::{
    ClassDispatcher, CommandDispatcher, DispatchError, DispatchOutcome, EventRouter,
    NotificationDispatcher,
};
pub use handlers::{kudos_router, GiveKudosHandler, LeaderboardHandler};
pub use registry::{EventHandler, HandlerRegistry, HandlerRegistryBuilder};
pub use tenants::{
    AddOutcome, ApiHandle, TenantConnection, TenantError, TenantManager, TenantManagerConfig,
};
