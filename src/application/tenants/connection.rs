//! TenantConnection - one tenant's live stream plus its swappable API handle.
//!
//! The connection is shared between the manager, the pump task, and any
//! handler currently running for the tenant. The chat API handle is held in
//! an [`ArcSwap`]: a refresh stores a whole new [`ApiHandle`], and each
//! reader works from one snapshot, so a send never sees half of an update.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::domain::foundation::{EnvelopeId, SessionId, TenantId};
use crate::domain::tenant::{BotIdentity, ConnectionStatus};
use crate::ports::{ChatApi, EventStream, TransportError};

/// Versioned chat API bound to one set of credentials.
pub struct ApiHandle {
    pub version: u64,
    pub api: Arc<dyn ChatApi>,
}

/// Handle given to handlers for replying and querying account info.
pub struct TenantConnection {
    tenant_id: TenantId,
    team_name: String,
    session_id: SessionId,
    stream: Arc<dyn EventStream>,
    api: ArcSwap<ApiHandle>,
    status: AtomicU8,
}

impl TenantConnection {
    pub fn new(
        tenant_id: TenantId,
        team_name: impl Into<String>,
        stream: Arc<dyn EventStream>,
        api: Arc<dyn ChatApi>,
    ) -> Self {
        Self {
            tenant_id,
            team_name: team_name.into(),
            session_id: SessionId::new(),
            stream,
            api: ArcSwap::from_pointee(ApiHandle { version: 1, api }),
            status: AtomicU8::new(ConnectionStatus::Connecting.as_u8()),
        }
    }

    pub fn tenant_id(&self) -> &TenantId {
        &self.tenant_id
    }

    pub fn team_name(&self) -> &str {
        &self.team_name
    }

    /// Identity of the pump/run pair serving this connection.
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Consistent snapshot of the current API handle.
    pub fn api(&self) -> Arc<ApiHandle> {
        self.api.load_full()
    }

    pub fn api_version(&self) -> u64 {
        self.api.load().version
    }

    /// Replaces the API handle in place and returns the new version.
    pub(crate) fn swap_api(&self, api: Arc<dyn ChatApi>) -> u64 {
        let previous = self.api.rcu(|current| ApiHandle {
            version: current.version + 1,
            api: Arc::clone(&api),
        });
        previous.version + 1
    }

    pub(crate) fn stream(&self) -> Arc<dyn EventStream> {
        Arc::clone(&self.stream)
    }

    pub fn status(&self) -> ConnectionStatus {
        ConnectionStatus::from_u8(self.status.load(Ordering::Acquire))
    }

    /// Moves to `next` if the lifecycle allows it. Returns false otherwise.
    pub(crate) fn transition(&self, next: ConnectionStatus) -> bool {
        let mut current = self.status.load(Ordering::Acquire);
        loop {
            if !ConnectionStatus::from_u8(current).can_transition_to(&next) {
                return false;
            }
            match self.status.compare_exchange(
                current,
                next.as_u8(),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }

    /// Sends the protocol receipt for an envelope over this tenant's stream.
    pub async fn acknowledge(&self, envelope_id: &EnvelopeId) -> Result<(), TransportError> {
        self.stream.acknowledge(envelope_id).await
    }

    /// Posts text to a channel using the current credentials.
    pub async fn send_text(&self, channel: &str, text: &str) -> Result<(), TransportError> {
        let handle = self.api();
        handle.api.send_text(channel, text).await
    }

    pub async fn who_am_i(&self) -> Result<BotIdentity, TransportError> {
        let handle = self.api();
        handle.api.who_am_i().await
    }
}

impl std::fmt::Debug for TenantConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TenantConnection")
            .field("tenant_id", &self.tenant_id)
            .field("session_id", &self.session_id)
            .field("api_version", &self.api_version())
            .field("status", &self.status())
            .finish()
    }
}
