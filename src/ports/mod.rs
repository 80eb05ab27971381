//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the core and the outside world. Adapters implement these ports.
//!
//! ## Storage Ports
//!
//! - `CredentialStore` - Whole-record workspace credentials
//! - `CounterStore` - Atomic per-tenant kudos counters
//!
//! ## Slack Ports
//!
//! - `EventStream` / `ChatApi` / `TransportFactory` - Per-tenant transport
//! - `OAuthExchange` - Install-time code exchange and token refresh

mod counter_store;
mod credential_store;
mod oauth_exchange;
mod transport;

pub use counter_store::CounterStore;
pub use credential_store::CredentialStore;
pub use oauth_exchange::{OAuthExchange, OAuthGrant, TokenRefresh};
pub use transport::{ChatApi, EventStream, TransportError, TransportFactory};
