//! HTTP handlers for the install flow.
//!
//! `/oauth/callback` is where a workspace becomes a tenant: the code is
//! exchanged, the credentials saved, and the connection started.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::adapters::slack::authorize_url;
use crate::application::tenants::TenantManager;
use crate::domain::foundation::Timestamp;
use crate::ports::{CredentialStore, OAuthExchange};

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// OAuth client settings used to build the authorize link.
#[derive(Debug, Clone)]
pub struct InstallSettings {
    pub client_id: String,
    pub scopes: String,
    pub redirect_uri: String,
}

/// Shared state for the install routes.
#[derive(Clone)]
pub struct InstallAppState {
    pub credentials: Arc<dyn CredentialStore>,
    pub oauth: Arc<dyn OAuthExchange>,
    pub manager: Arc<TenantManager>,
    pub settings: Arc<InstallSettings>,
}

// ════════════════════════════════════════════════════════════════════════════════
// DTOs
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    /// Managed workspaces, including disconnected ones
    pub tenants: usize,
    pub live: usize,
}

// ════════════════════════════════════════════════════════════════════════════════
// Handlers
// ════════════════════════════════════════════════════════════════════════════════

/// GET / - Landing page with an install link.
pub async fn landing() -> Html<&'static str> {
    Html(
        "<html><body><h1>Kudos for Slack</h1>\
         <p>Give a teammate kudos with <code>@user ++</code> and see the leaderboard with <code>/kudos</code>.</p>\
         <p><a href=\"/oauth/start\">Add to Slack</a></p></body></html>",
    )
}

/// GET /oauth/start - Redirects to Slack's authorize page.
pub async fn oauth_start(State(state): State<InstallAppState>) -> Response {
    let settings = &state.settings;
    match authorize_url(&settings.client_id, &settings.scopes, &settings.redirect_uri) {
        Ok(url) => Redirect::temporary(&url).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to build authorize URL");
            (StatusCode::INTERNAL_SERVER_ERROR, "Install link unavailable").into_response()
        }
    }
}

/// GET /oauth/callback - Completes an install.
pub async fn oauth_callback(
    State(state): State<InstallAppState>,
    Query(params): Query<CallbackParams>,
) -> Response {
    if let Some(error) = params.error {
        tracing::info!(error = %error, "Install cancelled by user");
        return (
            StatusCode::BAD_REQUEST,
            format!("Installation was cancelled: {}", error),
        )
            .into_response();
    }

    let code = match params.code.filter(|c| !c.is_empty()) {
        Some(code) => code,
        None => return (StatusCode::BAD_REQUEST, "Missing code parameter").into_response(),
    };

    let grant = match state
        .oauth
        .exchange_code(&code, &state.settings.redirect_uri)
        .await
    {
        Ok(grant) => grant,
        Err(e) => {
            tracing::warn!(error = %e, "OAuth code exchange failed");
            return (StatusCode::BAD_GATEWAY, "Could not complete installation with Slack")
                .into_response();
        }
    };

    let credentials = grant.into_credentials(Timestamp::now());
    if let Err(e) = state.credentials.save(&credentials).await {
        tracing::error!(tenant_id = %credentials.tenant_id, error = %e, "Failed to save workspace");
        return (StatusCode::INTERNAL_SERVER_ERROR, "Could not save workspace").into_response();
    }

    if let Err(e) = state.manager.add_tenant(&credentials).await {
        tracing::error!(tenant_id = %credentials.tenant_id, error = %e, "Failed to start workspace");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Workspace saved, but the bot could not connect",
        )
            .into_response();
    }

    tracing::info!(
        tenant_id = %credentials.tenant_id,
        team_name = %credentials.team_name,
        "Workspace installed"
    );
    (
        StatusCode::OK,
        format!(
            "Kudos is installed in {}! Try `@someone ++` in a channel the bot is in.",
            credentials.team_name
        ),
    )
        .into_response()
}

/// GET /health - Liveness plus the number of managed workspaces.
pub async fn health(State(state): State<InstallAppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        tenants: state.manager.len().await,
        live: state.manager.live_count().await,
    })
}
