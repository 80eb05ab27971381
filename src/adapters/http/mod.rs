//! HTTP adapters - axum routes exposed by the bot process.

pub mod install;

// Re-export key types for convenience
pub use install::{install_router, InstallAppState, InstallSettings};
