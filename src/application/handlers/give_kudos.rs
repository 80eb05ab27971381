//! GiveKudosHandler - `<@user> ++` in a message grants one kudos.

use std::sync::Arc;

use async_trait::async_trait;

use crate::application::dispatch::DispatchError;
use crate::application::registry::EventHandler;
use crate::application::tenants::TenantConnection;
use crate::domain::envelope::MessageEvent;
use crate::domain::kudos::{
    extract_recipient, is_kudos_trigger, kudos_granted_reply, WORKSPACE_NOT_SET_UP_REPLY,
};
use crate::ports::CounterStore;

/// Handler for kudos grants in channel messages.
pub struct GiveKudosHandler {
    counters: Arc<dyn CounterStore>,
}

impl GiveKudosHandler {
    pub const NAME: &'static str = "give_kudos";

    pub fn new(counters: Arc<dyn CounterStore>) -> Self {
        Self { counters }
    }
}

#[async_trait]
impl EventHandler<MessageEvent> for GiveKudosHandler {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn matches(&self, text: &str) -> bool {
        is_kudos_trigger(text)
    }

    async fn handle(
        &self,
        connection: &TenantConnection,
        message: &MessageEvent,
    ) -> Result<(), DispatchError> {
        let recipient = extract_recipient(&message.text).ok_or_else(|| {
            DispatchError::InvalidArgument(format!("no recipient in '{}'", message.text))
        })?;

        // Counters are keyed by the connection's tenant, never by payload fields.
        let count = match self
            .counters
            .increment_or_create(connection.tenant_id(), &recipient)
            .await
        {
            Ok(count) => count,
            Err(e) if e.is_unknown_tenant() => {
                connection
                    .send_text(&message.channel, WORKSPACE_NOT_SET_UP_REPLY)
                    .await?;
                return Err(e.into());
            }
            Err(e) => return Err(e.into()),
        };

        tracing::info!(
            tenant_id = %connection.tenant_id(),
            recipient = %recipient,
            giver = message.user.as_deref().unwrap_or("unknown"),
            count,
            "Kudos granted"
        );

        connection
            .send_text(&message.channel, &kudos_granted_reply(&recipient, count))
            .await?;
        Ok(())
    }
}
