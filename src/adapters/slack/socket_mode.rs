//! SocketModeStream - EventStream over a Slack Socket Mode WebSocket.
//!
//! # Protocol
//!
//! 1. `apps.connections.open` with the app-level token returns a one-shot
//!    `wss://` URL.
//! 2. The server greets with `{"type": "hello"}`.
//! 3. Every event arrives as an envelope carrying an `envelope_id`, which is
//!    acknowledged by writing `{"envelope_id": "..."}` back.
//! 4. `{"type": "disconnect"}` asks the client to reconnect with a fresh URL.
//!    This is routine session maintenance and is handled inside `run`.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::{mpsc, Mutex};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_util::sync::CancellationToken;

use crate::domain::envelope::RawEnvelope;
use crate::domain::foundation::{EnvelopeId, TenantId};
use crate::ports::{EventStream, TransportError};

use super::api::read_response;

/// One text frame received from the socket.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum SocketFrame {
    Hello { num_connections: Option<u64> },
    Disconnect { reason: Option<String> },
    Envelope(RawEnvelope),
    Other(String),
}

pub(crate) fn parse_frame(text: &str) -> Result<SocketFrame, serde_json::Error> {
    let value: Value = serde_json::from_str(text)?;
    let kind = value
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let frame = match kind.as_str() {
        "hello" => SocketFrame::Hello {
            num_connections: value.get("num_connections").and_then(Value::as_u64),
        },
        "disconnect" => SocketFrame::Disconnect {
            reason: value
                .get("reason")
                .and_then(Value::as_str)
                .map(str::to_string),
        },
        _ if value.get("envelope_id").is_some() => {
            SocketFrame::Envelope(serde_json::from_value(value)?)
        }
        _ => SocketFrame::Other(kind),
    };
    Ok(frame)
}

pub(crate) fn ack_frame(envelope_id: &EnvelopeId) -> String {
    serde_json::json!({ "envelope_id": envelope_id.as_str() }).to_string()
}

#[derive(Debug, Deserialize)]
struct ConnectionsOpenBody {
    url: String,
}

enum SessionEnd {
    Cancelled,
    Reconnect,
}

/// Socket Mode session for one workspace.
pub struct SocketModeStream {
    client: Client,
    base_url: String,
    app_token: SecretString,
    tenant_id: TenantId,
    outbound: Mutex<Option<mpsc::UnboundedSender<Message>>>,
}

impl SocketModeStream {
    pub fn new(
        client: Client,
        base_url: impl Into<String>,
        app_token: SecretString,
        tenant_id: TenantId,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            app_token,
            tenant_id,
            outbound: Mutex::new(None),
        }
    }

    /// Asks Slack for a fresh WebSocket URL.
    async fn open_connection(&self) -> Result<String, TransportError> {
        let response = self
            .client
            .post(format!("{}/apps.connections.open", self.base_url))
            .bearer_auth(self.app_token.expose_secret())
            .send()
            .await
            .map_err(|e| TransportError::Http(e.to_string()))?;

        let body: ConnectionsOpenBody = read_response(response).await.map_err(|e| match e {
            TransportError::Api(code) => TransportError::OpenRejected(code),
            other => other,
        })?;
        Ok(body.url)
    }

    /// Serves one WebSocket session until it ends or fails.
    async fn serve(
        &self,
        url: &str,
        inbound: &mpsc::Sender<RawEnvelope>,
        cancel: &CancellationToken,
    ) -> Result<SessionEnd, TransportError> {
        let (socket, _) = connect_async(url)
            .await
            .map_err(|e| TransportError::WebSocket(e.to_string()))?;
        let (mut write, mut read) = socket.split();

        let (tx, mut rx) = mpsc::unbounded_channel::<Message>();
        *self.outbound.lock().await = Some(tx);

        let end = loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    let _ = write.send(Message::Close(None)).await;
                    break Ok(SessionEnd::Cancelled);
                }
                Some(message) = rx.recv() => {
                    if let Err(e) = write.send(message).await {
                        break Err(TransportError::WebSocket(e.to_string()));
                    }
                }
                frame = read.next() => match frame {
                    Some(Ok(Message::Text(text))) => match parse_frame(&text) {
                        Ok(SocketFrame::Hello { num_connections }) => {
                            tracing::info!(
                                tenant_id = %self.tenant_id,
                                num_connections,
                                "Socket Mode session ready"
                            );
                        }
                        Ok(SocketFrame::Disconnect { reason }) => {
                            tracing::info!(
                                tenant_id = %self.tenant_id,
                                reason = reason.as_deref().unwrap_or("unspecified"),
                                "Server requested reconnect"
                            );
                            break Ok(SessionEnd::Reconnect);
                        }
                        Ok(SocketFrame::Envelope(envelope)) => {
                            if inbound.send(envelope).await.is_err() {
                                break Err(TransportError::InboundClosed);
                            }
                        }
                        Ok(SocketFrame::Other(kind)) => {
                            tracing::trace!(tenant_id = %self.tenant_id, kind = %kind, "Ignoring frame");
                        }
                        Err(e) => {
                            tracing::warn!(tenant_id = %self.tenant_id, error = %e, "Unparseable frame");
                        }
                    },
                    Some(Ok(Message::Close(_))) | None => {
                        tracing::info!(tenant_id = %self.tenant_id, "Socket closed by server");
                        break Ok(SessionEnd::Reconnect);
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => break Err(TransportError::WebSocket(e.to_string())),
                },
            }
        };

        *self.outbound.lock().await = None;
        end
    }
}

#[async_trait]
impl EventStream for SocketModeStream {
    async fn run(
        &self,
        inbound: mpsc::Sender<RawEnvelope>,
        cancel: CancellationToken,
    ) -> Result<(), TransportError> {
        loop {
            let url = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(()),
                url = self.open_connection() => url?,
            };

            match self.serve(&url, &inbound, &cancel).await? {
                SessionEnd::Cancelled => return Ok(()),
                SessionEnd::Reconnect => {
                    tracing::debug!(tenant_id = %self.tenant_id, "Reconnecting Socket Mode session");
                }
            }
        }
    }

    async fn acknowledge(&self, envelope_id: &EnvelopeId) -> Result<(), TransportError> {
        let outbound = self.outbound.lock().await;
        let tx = outbound.as_ref().ok_or(TransportError::NotConnected)?;
        tx.send(Message::Text(ack_frame(envelope_id)))
            .map_err(|_| TransportError::NotConnected)
    }
}
