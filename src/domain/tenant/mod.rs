//! Tenant domain module.
//!
//! A tenant is one installed workspace. This module holds what is persisted
//! about it and the status of its live connection.
//!
//! # Module Structure
//!
//! - `credentials` - TenantCredentials record and refresh-window rule
//! - `status` - ConnectionStatus lifecycle

mod credentials;
mod status;

pub use credentials::{parse_scopes, BotIdentity, TenantCredentials, REFRESH_WINDOW_SECS};
pub use status::ConnectionStatus;
