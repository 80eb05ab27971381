//! HTTP adapter for installing the bot into a workspace.
//!
//! - `GET /` - Landing page
//! - `GET /oauth/start` - Start the OAuth v2 install
//! - `GET /oauth/callback` - Finish it
//! - `GET /health` - Liveness

mod handlers;
mod routes;

pub use handlers::{CallbackParams, HealthResponse, InstallAppState, InstallSettings};
pub use routes::install_router;
