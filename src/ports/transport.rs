//! Transport ports - the live event stream and the outbound chat API of one
//! tenant.
//!
//! ## Event stream
//!
//! [`EventStream::run`] maintains the underlying session and pushes every
//! received envelope into the supplied channel. The resulting sequence is
//! effectively infinite and cannot be restarted: `run` returns only when the
//! session fails for good (`Err`) or the cancellation token fires (`Ok`).
//! Routine reconnects requested by the server are handled inside `run`.
//!
//! ## Chat API
//!
//! [`ChatApi`] is bound to one bot token. A credential refresh replaces the
//! whole `ChatApi` value rather than mutating it.
//!
//! # Example
//!
//! ```ignore
//! let stream = factory.event_stream(&creds)?;
//! let (tx, mut rx) = mpsc::channel(64);
//! tokio::spawn(async move { stream.run(tx, cancel).await });
//! while let Some(envelope) = rx.recv().await {
//!     stream.acknowledge(&envelope.envelope_id).await?;
//! }
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::domain::envelope::RawEnvelope;
use crate::domain::foundation::EnvelopeId;
use crate::domain::tenant::{BotIdentity, TenantCredentials};

/// Errors raised by a tenant's transport.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// Opening a session was refused (bad app token, revoked app)
    #[error("Connection open rejected: {0}")]
    OpenRejected(String),

    /// Socket-level failure
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// The remote API answered with an error
    #[error("API error: {0}")]
    Api(String),

    /// Request could not be delivered
    #[error("HTTP error: {0}")]
    Http(String),

    /// Response body did not have the expected shape
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// No live session to write to
    #[error("Not connected")]
    NotConnected,

    /// Consumer of the inbound sequence went away
    #[error("Inbound channel closed")]
    InboundClosed,
}

/// One tenant's long-lived bidirectional event stream.
#[async_trait]
pub trait EventStream: Send + Sync {
    /// Runs the session, forwarding envelopes to `inbound` in arrival order.
    async fn run(
        &self,
        inbound: mpsc::Sender<RawEnvelope>,
        cancel: CancellationToken,
    ) -> Result<(), TransportError>;

    /// Sends the protocol receipt for one envelope.
    async fn acknowledge(&self, envelope_id: &EnvelopeId) -> Result<(), TransportError>;
}

/// Outbound calls made with a tenant's bot token.
#[async_trait]
pub trait ChatApi: Send + Sync {
    /// Posts plain text to a channel.
    async fn send_text(&self, channel: &str, text: &str) -> Result<(), TransportError>;

    /// Who the token belongs to.
    async fn who_am_i(&self) -> Result<BotIdentity, TransportError>;
}

/// Builds per-tenant transport objects from stored credentials.
pub trait TransportFactory: Send + Sync {
    fn event_stream(&self, credentials: &TenantCredentials)
        -> Result<Arc<dyn EventStream>, TransportError>;

    fn chat_api(&self, credentials: &TenantCredentials) -> Result<Arc<dyn ChatApi>, TransportError>;
}
