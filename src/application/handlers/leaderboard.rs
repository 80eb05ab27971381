//! LeaderboardHandler - `/kudos [n]` lists the top kudos receivers.

use std::sync::Arc;

use async_trait::async_trait;

use crate::application::dispatch::DispatchError;
use crate::application::registry::EventHandler;
use crate::application::tenants::TenantConnection;
use crate::domain::envelope::SlashCommand;
use crate::domain::foundation::DomainError;
use crate::domain::kudos::{
    leaderboard_reply, parse_limit, INVALID_NUMBER_REPLY, WORKSPACE_NOT_SET_UP_REPLY,
};
use crate::ports::CounterStore;

pub const LEADERBOARD_COMMAND: &str = "/kudos";
pub const LEADERBOARD_FAILED_REPLY: &str = "Failed to retrieve top kudos users.";

/// Handler for the leaderboard slash command.
pub struct LeaderboardHandler {
    counters: Arc<dyn CounterStore>,
}

impl LeaderboardHandler {
    pub const NAME: &'static str = "leaderboard";

    pub fn new(counters: Arc<dyn CounterStore>) -> Self {
        Self { counters }
    }

    async fn fail(
        &self,
        connection: &TenantConnection,
        channel: &str,
        reply: &str,
        error: DomainError,
    ) -> Result<(), DispatchError> {
        connection.send_text(channel, reply).await?;
        Err(error.into())
    }
}

#[async_trait]
impl EventHandler<SlashCommand> for LeaderboardHandler {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn matches(&self, command: &str) -> bool {
        command.trim() == LEADERBOARD_COMMAND
    }

    async fn handle(
        &self,
        connection: &TenantConnection,
        command: &SlashCommand,
    ) -> Result<(), DispatchError> {
        let channel = command.channel_id.as_str();

        let limit = match parse_limit(&command.text) {
            Ok(limit) => limit,
            Err(e) => {
                connection.send_text(channel, INVALID_NUMBER_REPLY).await?;
                return Err(DispatchError::InvalidArgument(e.to_string()));
            }
        };

        let tenant_id = connection.tenant_id();
        let entries = match self.counters.top_n(tenant_id, limit).await {
            Ok(entries) => entries,
            Err(e) if e.is_unknown_tenant() => {
                return self
                    .fail(connection, channel, WORKSPACE_NOT_SET_UP_REPLY, e)
                    .await;
            }
            Err(e) => {
                return self
                    .fail(connection, channel, LEADERBOARD_FAILED_REPLY, e)
                    .await;
            }
        };

        // An empty board is indistinguishable from an uninstalled workspace
        // until the workspace record is checked.
        if entries.is_empty() {
            match self.counters.workspace_exists(tenant_id).await {
                Ok(true) => {}
                Ok(false) => {
                    return self
                        .fail(
                            connection,
                            channel,
                            WORKSPACE_NOT_SET_UP_REPLY,
                            DomainError::unknown_tenant(tenant_id),
                        )
                        .await;
                }
                Err(e) => {
                    return self
                        .fail(connection, channel, LEADERBOARD_FAILED_REPLY, e)
                        .await;
                }
            }
        }

        tracing::debug!(
            tenant_id = %tenant_id,
            limit,
            entries = entries.len(),
            "Serving leaderboard"
        );

        connection
            .send_text(channel, &leaderboard_reply(limit, &entries))
            .await?;
        Ok(())
    }
}
