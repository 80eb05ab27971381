//! Axum router configuration for the install flow.

use axum::{routing::get, Router};

use super::handlers::{health, landing, oauth_callback, oauth_start, InstallAppState};

/// Create the install router.
///
/// # Routes
/// - `GET /` - Landing page with an "Add to Slack" link
/// - `GET /oauth/start` - Redirect to Slack's authorize page
/// - `GET /oauth/callback` - Code exchange, save, connect
/// - `GET /health` - Liveness and managed workspace count
pub fn install_router() -> Router<InstallAppState> {
    Router::new()
        .route("/", get(landing))
        .route("/oauth/start", get(oauth_start))
        .route("/oauth/callback", get(oauth_callback))
        .route("/health", get(health))
}
