//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the application to external systems:
//! - `http` - Install flow and health routes (axum)
//! - `memory` - In-process store and transport for tests and local runs
//! - `slack` - Socket Mode stream, Web API, and OAuth client
//! - `sqlite` - Credential and counter persistence (sqlx)

pub mod http;
pub mod memory;
pub mod slack;
pub mod sqlite;

pub use self::http::{install_router, InstallAppState, InstallSettings};
pub use memory::{InMemoryStore, InMemoryTransport};
pub use slack::{SlackOAuthClient, SlackTransportFactory};
pub use sqlite::SqliteStore;
