//! In-process transport for testing.
//!
//! Provides scriptable implementations of the transport ports, allowing the
//! tenant lifecycle and dispatch path to run without a Slack connection.
//!
//! # Features
//!
//! - Envelope injection per tenant
//! - Transport failure injection
//! - Acknowledgment and outbound message capture
//! - Run and build counters for lifecycle assertions
//!
//! # Panics
//!
//! Methods may panic if internal locks are poisoned. This is acceptable for
//! test code but this adapter should NOT be used in production.
//!
//! # Example
//!
//! ```ignore
//! let transport = Arc::new(InMemoryTransport::new());
//! manager.add_tenant(&creds).await?;
//!
//! let stream = transport.stream(&creds.tenant_id).unwrap();
//! stream.deliver(envelope);
//! assert_eq!(transport.sent_messages().len(), 1);
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use secrecy::ExposeSecret;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::domain::envelope::RawEnvelope;
use crate::domain::foundation::{EnvelopeId, TenantId, UserId};
use crate::domain::tenant::{BotIdentity, TenantCredentials};
use crate::ports::{ChatApi, EventStream, TransportError, TransportFactory};

/// One captured outbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub tenant_id: TenantId,
    /// Bot token the message was sent with.
    pub token: String,
    pub channel: String,
    pub text: String,
}

enum Scripted {
    Envelope(RawEnvelope),
    Fail(TransportError),
}

/// Scriptable [`EventStream`] for one tenant.
pub struct InMemoryEventStream {
    tenant_id: TenantId,
    script_tx: mpsc::UnboundedSender<Scripted>,
    script_rx: tokio::sync::Mutex<Option<mpsc::UnboundedReceiver<Scripted>>>,
    acknowledged: Mutex<Vec<EnvelopeId>>,
    runs: AtomicUsize,
}

impl InMemoryEventStream {
    pub fn new(tenant_id: TenantId) -> Self {
        let (script_tx, script_rx) = mpsc::unbounded_channel();
        Self {
            tenant_id,
            script_tx,
            script_rx: tokio::sync::Mutex::new(Some(script_rx)),
            acknowledged: Mutex::new(Vec::new()),
            runs: AtomicUsize::new(0),
        }
    }

    pub fn tenant_id(&self) -> &TenantId {
        &self.tenant_id
    }

    /// Queues an envelope as if it had arrived over the wire.
    pub fn deliver(&self, envelope: RawEnvelope) -> bool {
        self.script_tx.send(Scripted::Envelope(envelope)).is_ok()
    }

    /// Makes the running session fail with `error`.
    pub fn fail(&self, error: TransportError) -> bool {
        self.script_tx.send(Scripted::Fail(error)).is_ok()
    }

    /// Envelope ids acknowledged so far, in order.
    pub fn acknowledged(&self) -> Vec<EnvelopeId> {
        self.acknowledged
            .lock()
            .expect("InMemoryEventStream: ack lock poisoned")
            .clone()
    }

    /// How many times `run` was entered.
    pub fn run_count(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EventStream for InMemoryEventStream {
    async fn run(
        &self,
        inbound: mpsc::Sender<RawEnvelope>,
        cancel: CancellationToken,
    ) -> Result<(), TransportError> {
        self.runs.fetch_add(1, Ordering::SeqCst);

        // The sequence is not restartable.
        let mut script = self
            .script_rx
            .lock()
            .await
            .take()
            .ok_or(TransportError::NotConnected)?;

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(()),
                next = script.recv() => match next {
                    Some(Scripted::Envelope(envelope)) => {
                        inbound
                            .send(envelope)
                            .await
                            .map_err(|_| TransportError::InboundClosed)?;
                    }
                    Some(Scripted::Fail(error)) => return Err(error),
                    None => return Err(TransportError::NotConnected),
                },
            }
        }
    }

    async fn acknowledge(&self, envelope_id: &EnvelopeId) -> Result<(), TransportError> {
        self.acknowledged
            .lock()
            .expect("InMemoryEventStream: ack lock poisoned")
            .push(envelope_id.clone());
        Ok(())
    }
}

/// [`ChatApi`] that records instead of sending.
pub struct RecordingChatApi {
    tenant_id: TenantId,
    token: String,
    bot_user_id: UserId,
    sent: Arc<Mutex<Vec<SentMessage>>>,
    fail_sends: bool,
}

#[async_trait]
impl ChatApi for RecordingChatApi {
    async fn send_text(&self, channel: &str, text: &str) -> Result<(), TransportError> {
        if self.fail_sends {
            return Err(TransportError::Api("channel_not_found".to_string()));
        }
        self.sent
            .lock()
            .expect("RecordingChatApi: sent lock poisoned")
            .push(SentMessage {
                tenant_id: self.tenant_id.clone(),
                token: self.token.clone(),
                channel: channel.to_string(),
                text: text.to_string(),
            });
        Ok(())
    }

    async fn who_am_i(&self) -> Result<BotIdentity, TransportError> {
        Ok(BotIdentity {
            tenant_id: self.tenant_id.clone(),
            bot_user_id: self.bot_user_id.clone(),
            bot_name: "kudos".to_string(),
        })
    }
}

/// [`TransportFactory`] handing out in-memory streams and recording chat APIs.
#[derive(Default)]
pub struct InMemoryTransport {
    streams: Mutex<HashMap<TenantId, Arc<InMemoryEventStream>>>,
    sent: Arc<Mutex<Vec<SentMessage>>>,
    streams_built: AtomicUsize,
    chat_apis_built: AtomicUsize,
    fail_sends: bool,
}

impl InMemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every chat API built by this factory fails its sends.
    pub fn with_failing_sends(mut self) -> Self {
        self.fail_sends = true;
        self
    }

    /// The most recently built stream for a tenant.
    pub fn stream(&self, tenant_id: &TenantId) -> Option<Arc<InMemoryEventStream>> {
        self.streams
            .lock()
            .expect("InMemoryTransport: streams lock poisoned")
            .get(tenant_id)
            .cloned()
    }

    pub fn sent_messages(&self) -> Vec<SentMessage> {
        self.sent
            .lock()
            .expect("InMemoryTransport: sent lock poisoned")
            .clone()
    }

    pub fn streams_built(&self) -> usize {
        self.streams_built.load(Ordering::SeqCst)
    }

    pub fn chat_apis_built(&self) -> usize {
        self.chat_apis_built.load(Ordering::SeqCst)
    }
}

impl TransportFactory for InMemoryTransport {
    fn event_stream(
        &self,
        credentials: &TenantCredentials,
    ) -> Result<Arc<dyn EventStream>, TransportError> {
        let stream = Arc::new(InMemoryEventStream::new(credentials.tenant_id.clone()));
        self.streams
            .lock()
            .expect("InMemoryTransport: streams lock poisoned")
            .insert(credentials.tenant_id.clone(), Arc::clone(&stream));
        self.streams_built.fetch_add(1, Ordering::SeqCst);
        Ok(stream)
    }

    fn chat_api(&self, credentials: &TenantCredentials) -> Result<Arc<dyn ChatApi>, TransportError> {
        self.chat_apis_built.fetch_add(1, Ordering::SeqCst);
        let bot_user_id = match &credentials.bot_user_id {
            Some(id) => id.clone(),
            None => UserId::new("UBOT").map_err(|e| TransportError::InvalidResponse(e.to_string()))?,
        };
        Ok(Arc::new(RecordingChatApi {
            tenant_id: credentials.tenant_id.clone(),
            token: credentials.access_token.expose_secret().clone(),
            bot_user_id,
            sent: Arc::clone(&self.sent),
            fail_sends: self.fail_sends,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn creds(token: &str) -> TenantCredentials {
        TenantCredentials::new(TenantId::new("T1").unwrap(), "Acme", token)
    }

    #[tokio::test]
    async fn delivered_envelopes_reach_inbound_in_order() {
        let transport = InMemoryTransport::new();
        let stream = transport.event_stream(&creds("xoxb-1")).unwrap();
        let handle = transport.stream(&TenantId::new("T1").unwrap()).unwrap();

        handle.deliver(RawEnvelope::new("e-1", "events_api", json!({})));
        handle.deliver(RawEnvelope::new("e-2", "events_api", json!({})));

        let (tx, mut rx) = mpsc::channel(8);
        let cancel = CancellationToken::new();
        let runner = tokio::spawn({
            let cancel = cancel.clone();
            async move { stream.run(tx, cancel).await }
        });

        assert_eq!(rx.recv().await.unwrap().envelope_id.as_str(), "e-1");
        assert_eq!(rx.recv().await.unwrap().envelope_id.as_str(), "e-2");

        cancel.cancel();
        assert_eq!(runner.await.unwrap(), Ok(()));
    }

    #[tokio::test]
    async fn scripted_failure_ends_run_with_error() {
        let transport = InMemoryTransport::new();
        let stream = transport.event_stream(&creds("xoxb-1")).unwrap();
        transport
            .stream(&TenantId::new("T1").unwrap())
            .unwrap()
            .fail(TransportError::WebSocket("reset".to_string()));

        let (tx, _rx) = mpsc::channel(8);
        let result = stream.run(tx, CancellationToken::new()).await;
        assert_eq!(result, Err(TransportError::WebSocket("reset".to_string())));
    }

    #[tokio::test]
    async fn stream_cannot_be_restarted() {
        let transport = InMemoryTransport::new();
        let stream = transport.event_stream(&creds("xoxb-1")).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let (tx, _rx) = mpsc::channel(8);
        assert_eq!(stream.run(tx.clone(), cancel.clone()).await, Ok(()));
        assert_eq!(stream.run(tx, cancel).await, Err(TransportError::NotConnected));
    }

    #[tokio::test]
    async fn chat_api_records_token_used() {
        let transport = InMemoryTransport::new();
        let api = transport.chat_api(&creds("xoxb-42")).unwrap();
        api.send_text("C1", "hello").await.unwrap();

        let sent = transport.sent_messages();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].token, "xoxb-42");
        assert_eq!(sent[0].channel, "C1");
    }

    #[tokio::test]
    async fn failing_sends_surface_errors() {
        let transport = InMemoryTransport::new().with_failing_sends();
        let api = transport.chat_api(&creds("xoxb-1")).unwrap();
        assert!(api.send_text("C1", "hello").await.is_err());
        assert!(transport.sent_messages().is_empty());
    }
}
