//! TenantManager - owns one live connection per installed workspace.
//!
//! # Architecture
//!
//! ```text
//!                      ┌──────────── TenantEntry ────────────┐
//! add_tenant(creds) ─► │ run task:  EventStream::run ──► tx  │
//!                      │ pump task: rx ──► EventRouter       │
//!                      │ CancellationToken (stops both)      │
//!                      └─────────────────────────────────────┘
//! ```
//!
//! A second `add_tenant` for a live workspace only swaps the chat API handle;
//! the stream, its tasks, and any in-flight handler are left alone.
//!
//! # Thread Safety
//!
//! The map sits behind a `RwLock`. Lookups take the read side; add and
//! remove take the write side for the whole check-then-act, so two adds
//! racing for the same new workspace start exactly one connection.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::application::dispatch::EventRouter;
use crate::domain::envelope::RawEnvelope;
use crate::domain::foundation::{SessionId, TenantId, ValidationError};
use crate::domain::tenant::{ConnectionStatus, TenantCredentials};
use crate::ports::{TransportError, TransportFactory};

use super::TenantConnection;

/// Default capacity of the channel between a run task and its pump.
pub const DEFAULT_EVENT_BUFFER: usize = 64;

/// Tunables for [`TenantManager`].
#[derive(Debug, Clone)]
pub struct TenantManagerConfig {
    /// Envelopes buffered between a tenant's stream and its pump.
    pub event_buffer: usize,
}

impl Default for TenantManagerConfig {
    fn default() -> Self {
        Self {
            event_buffer: DEFAULT_EVENT_BUFFER,
        }
    }
}

/// Why a workspace could not be added.
#[derive(Debug, Error)]
pub enum TenantError {
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(#[from] ValidationError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

/// What `add_tenant` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// A new connection was started.
    Started { session_id: SessionId },
    /// The live connection kept its stream and received a new API handle.
    Refreshed { version: u64 },
}

struct TenantEntry {
    connection: Arc<TenantConnection>,
    cancel: CancellationToken,
    run_task: JoinHandle<()>,
    pump_task: JoinHandle<()>,
}

impl TenantEntry {
    fn stop(&self) {
        self.connection.transition(ConnectionStatus::Draining);
        self.cancel.cancel();
    }
}

/// Registry of live tenant connections.
pub struct TenantManager {
    transport: Arc<dyn TransportFactory>,
    router: Arc<EventRouter>,
    config: TenantManagerConfig,
    tenants: RwLock<HashMap<TenantId, TenantEntry>>,
}

impl TenantManager {
    pub fn new(
        transport: Arc<dyn TransportFactory>,
        router: Arc<EventRouter>,
        config: TenantManagerConfig,
    ) -> Self {
        Self {
            transport,
            router,
            config,
            tenants: RwLock::new(HashMap::new()),
        }
    }

    /// Starts serving a workspace, or refreshes the API handle of a live one.
    ///
    /// An entry whose stream has failed is replaced by a fresh connection.
    pub async fn add_tenant(
        &self,
        credentials: &TenantCredentials,
    ) -> Result<AddOutcome, TenantError> {
        credentials.validate()?;
        let tenant_id = &credentials.tenant_id;

        let mut tenants = self.tenants.write().await;

        if let Some(entry) = tenants.get(tenant_id) {
            if entry.connection.status().is_live() {
                let version = self.swap_api(entry, credentials)?;
                return Ok(AddOutcome::Refreshed { version });
            }
        }

        let stream = self.transport.event_stream(credentials)?;
        let api = self.transport.chat_api(credentials)?;
        let connection = Arc::new(TenantConnection::new(
            tenant_id.clone(),
            credentials.team_name.clone(),
            stream,
            api,
        ));
        let session_id = connection.session_id();

        let entry = self.start(connection);
        if let Some(previous) = tenants.insert(tenant_id.clone(), entry) {
            tracing::info!(
                tenant_id = %tenant_id,
                previous_session = %previous.connection.session_id(),
                status = %previous.connection.status(),
                "Replacing stopped connection"
            );
            previous.stop();
        }

        tracing::info!(
            tenant_id = %tenant_id,
            team_name = %credentials.team_name,
            session_id = %session_id,
            "Tenant connection started"
        );
        Ok(AddOutcome::Started { session_id })
    }

    /// Swaps the API handle of a live workspace to `credentials`.
    ///
    /// Never starts or restarts a connection: an absent, disconnected, or
    /// draining workspace is left as it is and `None` is returned.
    pub async fn refresh_tenant(
        &self,
        credentials: &TenantCredentials,
    ) -> Result<Option<u64>, TenantError> {
        credentials.validate()?;

        let tenants = self.tenants.write().await;
        match tenants.get(&credentials.tenant_id) {
            Some(entry) if entry.connection.status().is_live() => {
                Ok(Some(self.swap_api(entry, credentials)?))
            }
            _ => Ok(None),
        }
    }

    fn swap_api(
        &self,
        entry: &TenantEntry,
        credentials: &TenantCredentials,
    ) -> Result<u64, TenantError> {
        let api = self.transport.chat_api(credentials)?;
        let version = entry.connection.swap_api(api);
        tracing::info!(
            tenant_id = %credentials.tenant_id,
            session_id = %entry.connection.session_id(),
            version,
            "Refreshed API handle"
        );
        Ok(version)
    }

    /// Stops a workspace's connection. Returns false if it was not present.
    ///
    /// A handler already running for the workspace completes.
    pub async fn remove_tenant(&self, tenant_id: &TenantId) -> bool {
        let removed = self.tenants.write().await.remove(tenant_id);
        match removed {
            Some(entry) => {
                entry.stop();
                tracing::info!(
                    tenant_id = %tenant_id,
                    session_id = %entry.connection.session_id(),
                    "Tenant connection removed"
                );
                true
            }
            None => false,
        }
    }

    pub async fn get_tenant(&self, tenant_id: &TenantId) -> Option<Arc<TenantConnection>> {
        self.tenants
            .read()
            .await
            .get(tenant_id)
            .map(|entry| Arc::clone(&entry.connection))
    }

    pub async fn status(&self, tenant_id: &TenantId) -> Option<ConnectionStatus> {
        self.tenants
            .read()
            .await
            .get(tenant_id)
            .map(|entry| entry.connection.status())
    }

    /// Ids of every managed workspace, sorted.
    pub async fn tenant_ids(&self) -> Vec<TenantId> {
        let mut ids: Vec<TenantId> = self.tenants.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub async fn len(&self) -> usize {
        self.tenants.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tenants.read().await.is_empty()
    }

    /// Workspaces whose stream is connecting or running.
    pub async fn live_count(&self) -> usize {
        self.tenants
            .read()
            .await
            .values()
            .filter(|entry| entry.connection.status().is_live())
            .count()
    }

    /// Stops every connection and waits up to `grace` for the tasks to end.
    ///
    /// Tasks still running after `grace` are aborted.
    pub async fn shutdown(&self, grace: Duration) {
        let entries: Vec<(TenantId, TenantEntry)> = self.tenants.write().await.drain().collect();
        if entries.is_empty() {
            return;
        }

        tracing::info!(tenants = entries.len(), "Stopping tenant connections");

        let mut handles = Vec::with_capacity(entries.len() * 2);
        let mut aborts = Vec::with_capacity(entries.len() * 2);
        for (_, entry) in entries {
            entry.stop();
            aborts.push(entry.run_task.abort_handle());
            aborts.push(entry.pump_task.abort_handle());
            handles.push(entry.run_task);
            handles.push(entry.pump_task);
        }

        if tokio::time::timeout(grace, futures::future::join_all(handles))
            .await
            .is_err()
        {
            tracing::warn!(
                grace_secs = grace.as_secs(),
                "Tenant tasks did not stop in time, aborting"
            );
            for abort in aborts {
                abort.abort();
            }
        }
    }

    fn start(&self, connection: Arc<TenantConnection>) -> TenantEntry {
        let cancel = CancellationToken::new();
        let (tx, rx) = mpsc::channel(self.config.event_buffer.max(1));

        connection.transition(ConnectionStatus::Running);

        let run_task = tokio::spawn(run_stream(Arc::clone(&connection), tx, cancel.clone()));
        let pump_task = tokio::spawn(pump(
            Arc::clone(&connection),
            Arc::clone(&self.router),
            rx,
            cancel.clone(),
        ));

        TenantEntry {
            connection,
            cancel,
            run_task,
            pump_task,
        }
    }
}

/// Keeps the stream running until it fails or is cancelled.
async fn run_stream(
    connection: Arc<TenantConnection>,
    inbound: mpsc::Sender<RawEnvelope>,
    cancel: CancellationToken,
) {
    let result = connection.stream().run(inbound, cancel.clone()).await;

    match result {
        Ok(()) if cancel.is_cancelled() => {
            tracing::debug!(tenant_id = %connection.tenant_id(), "Event stream stopped");
        }
        Ok(()) => {
            tracing::warn!(tenant_id = %connection.tenant_id(), "Event stream ended");
            connection.transition(ConnectionStatus::Disconnected);
        }
        Err(e) => {
            tracing::error!(
                tenant_id = %connection.tenant_id(),
                session_id = %connection.session_id(),
                error = %e,
                "Event stream failed"
            );
            connection.transition(ConnectionStatus::Disconnected);
        }
    }
}

/// Routes envelopes in arrival order, one at a time.
async fn pump(
    connection: Arc<TenantConnection>,
    router: Arc<EventRouter>,
    mut inbound: mpsc::Receiver<RawEnvelope>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            next = inbound.recv() => match next {
                Some(envelope) => {
                    if let Err(e) = router.dispatch(&envelope, &connection).await {
                        tracing::warn!(
                            tenant_id = %connection.tenant_id(),
                            envelope_id = %envelope.envelope_id,
                            error = %e,
                            "Dispatch failed"
                        );
                    }
                }
                None => break,
            },
        }
    }

    tracing::debug!(tenant_id = %connection.tenant_id(), "Pump stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryTransport;
    use crate::application::dispatch::{CommandDispatcher, NotificationDispatcher};
    use crate::application::dispatch::DispatchError;
    use crate::application::registry::{EventHandler, HandlerRegistry};
    use crate::domain::envelope::{MessageEvent, SlashCommand};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::sync::Notify;

    /// Holds every message until released, then replies.
    struct GatedHandler {
        started: Notify,
        release: Notify,
        finished: AtomicBool,
    }

    #[async_trait]
    impl EventHandler<MessageEvent> for GatedHandler {
        fn name(&self) -> &'static str {
            "gated"
        }

        fn matches(&self, _text: &str) -> bool {
            true
        }

        async fn handle(
            &self,
            connection: &TenantConnection,
            message: &MessageEvent,
        ) -> Result<(), DispatchError> {
            self.started.notify_one();
            self.release.notified().await;
            connection.send_text(&message.channel, "done").await?;
            self.finished.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    fn empty_router() -> Arc<EventRouter> {
        Arc::new(EventRouter::new(
            NotificationDispatcher::notifications(HandlerRegistry::<MessageEvent>::builder().build()),
            CommandDispatcher::commands(HandlerRegistry::<SlashCommand>::builder().build()),
        ))
    }

    fn setup() -> (Arc<InMemoryTransport>, TenantManager) {
        let transport = Arc::new(InMemoryTransport::new());
        let manager = TenantManager::new(
            transport.clone(),
            empty_router(),
            TenantManagerConfig::default(),
        );
        (transport, manager)
    }

    fn creds(tenant: &str, token: &str) -> TenantCredentials {
        TenantCredentials::new(TenantId::new(tenant).unwrap(), "Acme", token)
    }

    async fn wait_for_status(manager: &TenantManager, tenant: &TenantId, want: ConnectionStatus) {
        for _ in 0..200 {
            if manager.status(tenant).await == Some(want) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("tenant {} never reached {}", tenant, want);
    }

    #[tokio::test]
    async fn add_starts_connection() {
        let (transport, manager) = setup();
        let outcome = manager.add_tenant(&creds("T1", "xoxb-1")).await.unwrap();

        assert!(matches!(outcome, AddOutcome::Started { .. }));
        let tenant = TenantId::new("T1").unwrap();
        let conn = manager.get_tenant(&tenant).await.unwrap();
        assert_eq!(conn.status(), ConnectionStatus::Running);
        assert_eq!(conn.api_version(), 1);
        assert_eq!(transport.streams_built(), 1);
    }

    #[tokio::test]
    async fn second_add_swaps_api_but_keeps_stream() {
        let (transport, manager) = setup();
        let tenant = TenantId::new("T1").unwrap();

        let first = manager.add_tenant(&creds("T1", "xoxb-1")).await.unwrap();
        let session = match first {
            AddOutcome::Started { session_id } => session_id,
            other => panic!("unexpected outcome {:?}", other),
        };

        let second = manager.add_tenant(&creds("T1", "xoxb-2")).await.unwrap();
        assert_eq!(second, AddOutcome::Refreshed { version: 2 });

        let conn = manager.get_tenant(&tenant).await.unwrap();
        assert_eq!(conn.session_id(), session);
        assert_eq!(transport.streams_built(), 1);
        assert_eq!(transport.chat_apis_built(), 2);

        conn.send_text("C1", "hi").await.unwrap();
        assert_eq!(transport.sent_messages()[0].token, "xoxb-2");
    }

    #[tokio::test]
    async fn blank_token_is_rejected() {
        let (transport, manager) = setup();
        let result = manager.add_tenant(&creds("T1", " ")).await;

        assert!(matches!(result, Err(TenantError::InvalidCredentials(_))));
        assert!(manager.is_empty().await);
        assert_eq!(transport.streams_built(), 0);
    }

    #[tokio::test]
    async fn remove_stops_and_forgets_tenant() {
        let (transport, manager) = setup();
        let tenant = TenantId::new("T1").unwrap();
        manager.add_tenant(&creds("T1", "xoxb-1")).await.unwrap();
        let conn = manager.get_tenant(&tenant).await.unwrap();

        assert!(manager.remove_tenant(&tenant).await);
        assert!(manager.get_tenant(&tenant).await.is_none());
        assert_eq!(conn.status(), ConnectionStatus::Draining);

        // The stream no longer accepts scripted envelopes once run exits.
        let stream = transport.stream(&tenant).unwrap();
        for _ in 0..200 {
            if !stream.deliver(RawEnvelope::new("late", "events_api", serde_json::json!({}))) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("stream kept running after removal");
    }

    #[tokio::test]
    async fn removing_unknown_tenant_returns_false() {
        let (_, manager) = setup();
        assert!(!manager.remove_tenant(&TenantId::new("T404").unwrap()).await);
    }

    #[tokio::test]
    async fn failed_stream_stays_registered_until_readded() {
        let (transport, manager) = setup();
        let tenant = TenantId::new("T1").unwrap();
        manager.add_tenant(&creds("T1", "xoxb-1")).await.unwrap();

        transport
            .stream(&tenant)
            .unwrap()
            .fail(TransportError::WebSocket("reset".to_string()));
        wait_for_status(&manager, &tenant, ConnectionStatus::Disconnected).await;
        assert_eq!(manager.len().await, 1);

        let outcome = manager.add_tenant(&creds("T1", "xoxb-1")).await.unwrap();
        assert!(matches!(outcome, AddOutcome::Started { .. }));
        assert_eq!(transport.streams_built(), 2);
        assert_eq!(manager.status(&tenant).await, Some(ConnectionStatus::Running));
    }

    #[tokio::test]
    async fn tenants_are_isolated() {
        let (transport, manager) = setup();
        manager.add_tenant(&creds("T1", "xoxb-1")).await.unwrap();
        manager.add_tenant(&creds("T2", "xoxb-2")).await.unwrap();

        let t1 = TenantId::new("T1").unwrap();
        transport
            .stream(&t1)
            .unwrap()
            .fail(TransportError::WebSocket("reset".to_string()));
        wait_for_status(&manager, &t1, ConnectionStatus::Disconnected).await;

        let t2 = TenantId::new("T2").unwrap();
        assert_eq!(manager.status(&t2).await, Some(ConnectionStatus::Running));
        assert_eq!(manager.tenant_ids().await, vec![t1, t2]);
        assert_eq!(manager.len().await, 2);
        assert_eq!(manager.live_count().await, 1);
    }

    #[tokio::test]
    async fn concurrent_adds_start_one_connection() {
        let (transport, manager) = setup();
        let manager = Arc::new(manager);

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let manager = Arc::clone(&manager);
            tasks.push(tokio::spawn(async move {
                manager.add_tenant(&creds("T1", "xoxb-1")).await.unwrap()
            }));
        }
        let outcomes: Vec<AddOutcome> = futures::future::join_all(tasks)
            .await
            .into_iter()
            .map(|r| r.unwrap())
            .collect();

        let started = outcomes
            .iter()
            .filter(|o| matches!(o, AddOutcome::Started { .. }))
            .count();
        assert_eq!(started, 1);
        assert_eq!(transport.streams_built(), 1);
    }

    #[tokio::test]
    async fn shutdown_empties_manager() {
        let (_, manager) = setup();
        manager.add_tenant(&creds("T1", "xoxb-1")).await.unwrap();
        manager.add_tenant(&creds("T2", "xoxb-2")).await.unwrap();

        manager.shutdown(Duration::from_secs(1)).await;

        assert!(manager.is_empty().await);
    }

    #[tokio::test]
    async fn refresh_swaps_only_live_tenants() {
        let (transport, manager) = setup();
        let t1 = TenantId::new("T1").unwrap();

        assert_eq!(manager.refresh_tenant(&creds("T1", "xoxb-2")).await.unwrap(), None);
        assert!(manager.get_tenant(&t1).await.is_none());

        manager.add_tenant(&creds("T1", "xoxb-1")).await.unwrap();
        assert_eq!(manager.refresh_tenant(&creds("T1", "xoxb-2")).await.unwrap(), Some(2));

        transport
            .stream(&t1)
            .unwrap()
            .fail(TransportError::WebSocket("reset".to_string()));
        wait_for_status(&manager, &t1, ConnectionStatus::Disconnected).await;

        assert_eq!(manager.refresh_tenant(&creds("T1", "xoxb-3")).await.unwrap(), None);
        assert_eq!(manager.status(&t1).await, Some(ConnectionStatus::Disconnected));
        assert_eq!(transport.streams_built(), 1);
    }

    #[tokio::test]
    async fn refresh_rejects_blank_token() {
        let (_, manager) = setup();
        manager.add_tenant(&creds("T1", "xoxb-1")).await.unwrap();
        let result = manager.refresh_tenant(&creds("T1", " ")).await;
        assert!(matches!(result, Err(TenantError::InvalidCredentials(_))));
    }

    #[tokio::test]
    async fn remove_during_in_flight_dispatch_lets_handler_finish() {
        let gate = Arc::new(GatedHandler {
            started: Notify::new(),
            release: Notify::new(),
            finished: AtomicBool::new(false),
        });
        let router = Arc::new(EventRouter::new(
            NotificationDispatcher::notifications(
                HandlerRegistry::<MessageEvent>::builder()
                    .register(gate.clone())
                    .build(),
            ),
            CommandDispatcher::commands(HandlerRegistry::<SlashCommand>::builder().build()),
        ));
        let transport = Arc::new(InMemoryTransport::new());
        let manager = TenantManager::new(transport.clone(), router, TenantManagerConfig::default());
        let t1 = TenantId::new("T1").unwrap();
        manager.add_tenant(&creds("T1", "xoxb-1")).await.unwrap();

        transport.stream(&t1).unwrap().deliver(RawEnvelope::new(
            "e-1",
            "events_api",
            json!({"team_id": "T1", "event": {"type": "message", "channel": "C1", "text": "<@U2> ++"}}),
        ));
        tokio::time::timeout(Duration::from_secs(1), gate.started.notified())
            .await
            .expect("handler should start");

        assert!(manager.remove_tenant(&t1).await);
        assert!(manager.get_tenant(&t1).await.is_none());

        gate.release.notify_one();
        for _ in 0..200 {
            if gate.finished.load(Ordering::SeqCst) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        assert!(gate.finished.load(Ordering::SeqCst));
        let sent = transport.sent_messages();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].tenant_id, t1);
        assert_eq!(sent[0].text, "done");
        assert!(manager.get_tenant(&t1).await.is_none());
    }
}
