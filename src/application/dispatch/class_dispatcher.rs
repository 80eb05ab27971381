//! Per-class dispatcher over one handler registry.

use std::sync::Arc;

use crate::application::registry::HandlerRegistry;
use crate::application::tenants::TenantConnection;
use crate::domain::envelope::{EnvelopeClass, MatchText, MessageEvent, SlashCommand};

use super::{DispatchError, DispatchOutcome};

/// Dispatches decoded payloads of one class against its registry.
pub struct ClassDispatcher<P> {
    class: EnvelopeClass,
    registry: Arc<HandlerRegistry<P>>,
}

/// Dispatcher for message notifications.
pub type NotificationDispatcher = ClassDispatcher<MessageEvent>;

/// Dispatcher for slash commands.
pub type CommandDispatcher = ClassDispatcher<SlashCommand>;

impl<P> ClassDispatcher<P>
where
    P: MatchText + Send + Sync,
{
    pub fn new(class: EnvelopeClass, registry: HandlerRegistry<P>) -> Self {
        Self {
            class,
            registry: Arc::new(registry),
        }
    }

    pub fn class(&self) -> EnvelopeClass {
        self.class
    }

    pub fn registry(&self) -> &HandlerRegistry<P> {
        &self.registry
    }

    /// Runs the first matching handler for `payload`.
    ///
    /// An unmatched payload is not an error.
    pub async fn dispatch(
        &self,
        connection: &TenantConnection,
        payload: &P,
    ) -> Result<DispatchOutcome, DispatchError> {
        let outcome = self.registry.dispatch(connection, payload).await?;

        match outcome {
            DispatchOutcome::Handled { handler } => tracing::debug!(
                tenant_id = %connection.tenant_id(),
                class = %self.class,
                handler,
                "Event handled"
            ),
            DispatchOutcome::Unmatched => tracing::trace!(
                tenant_id = %connection.tenant_id(),
                class = %self.class,
                "No handler matched"
            ),
            _ => {}
        }

        Ok(outcome)
    }
}

impl NotificationDispatcher {
    pub fn notifications(registry: HandlerRegistry<MessageEvent>) -> Self {
        Self::new(EnvelopeClass::Notification, registry)
    }
}

impl CommandDispatcher {
    pub fn commands(registry: HandlerRegistry<SlashCommand>) -> Self {
        Self::new(EnvelopeClass::Command, registry)
    }
}
