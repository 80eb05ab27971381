//! Kudos bot server.
//!
//! Loads configuration, restores every stored workspace, then serves the
//! install routes until SIGINT/SIGTERM.

use std::sync::Arc;

use anyhow::{anyhow, Context};
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use slack_kudos::adapters::{
    install_router, InstallAppState, InstallSettings, SlackOAuthClient, SlackTransportFactory,
    SqliteStore,
};
use slack_kudos::application::handlers::kudos_router;
use slack_kudos::application::{bootstrap_tenants, CredentialRefresher, TenantManager, TenantManagerConfig};
use slack_kudos::config::{AppConfig, LogFormat};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("failed to load configuration")?;
    init_tracing(&config);
    config.validate().context("invalid configuration")?;

    let client_secret = config
        .slack
        .client_secret
        .clone()
        .ok_or_else(|| anyhow!("KUDOS__SLACK__CLIENT_SECRET is not set"))?;
    let app_token = config
        .slack
        .app_token
        .clone()
        .ok_or_else(|| anyhow!("KUDOS__SLACK__APP_TOKEN is not set"))?;

    let store = Arc::new(
        SqliteStore::connect(&config.database)
            .await
            .context("failed to open database")?,
    );
    tracing::info!(url = %config.database.url, "Database ready");

    let transport = Arc::new(SlackTransportFactory::new(&config.slack.api_base_url, app_token)?);
    let oauth = Arc::new(SlackOAuthClient::new(
        transport.client(),
        &config.slack.api_base_url,
        &config.slack.client_id,
        client_secret,
    ));

    let manager = Arc::new(TenantManager::new(
        transport,
        Arc::new(kudos_router(store.clone())),
        TenantManagerConfig {
            event_buffer: config.slack.event_buffer,
        },
    ));
    let refresher = Arc::new(CredentialRefresher::new(store.clone(), oauth.clone()));

    match bootstrap_tenants(store.as_ref(), &refresher, &manager).await {
        Ok(report) => tracing::info!(
            loaded = report.loaded,
            started = report.started,
            skipped = report.skipped.len(),
            "Workspaces restored"
        ),
        Err(e) => tracing::error!(error = %e, "Failed to restore workspaces"),
    }

    let cancel = CancellationToken::new();
    let refresh_task = tokio::spawn({
        let refresher = Arc::clone(&refresher);
        let manager = Arc::clone(&manager);
        let interval = config.slack.refresh_interval();
        let cancel = cancel.clone();
        async move { refresher.run(manager, interval, cancel).await }
    });

    let state = InstallAppState {
        credentials: store,
        oauth,
        manager: Arc::clone(&manager),
        settings: Arc::new(InstallSettings {
            client_id: config.slack.client_id.clone(),
            scopes: config.slack.scopes.clone(),
            redirect_uri: config.redirect_uri(),
        }),
    };
    let app = install_router()
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    tracing::info!(%addr, base_url = %config.server.base_url(), "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    cancel.cancel();
    if let Err(e) = refresh_task.await {
        tracing::warn!(error = %e, "Refresh task ended abnormally");
    }
    manager.shutdown(config.server.shutdown_grace()).await;
    tracing::info!("Shutdown complete");

    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level));

    match config.server.log_format {
        LogFormat::Json => tracing_subscriber::fmt().with_env_filter(filter).json().init(),
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received SIGINT"),
        () = terminate => tracing::info!("Received SIGTERM"),
    }
}
