//! EventRouter - classify, acknowledge, then dispatch.
//!
//! For every recognized envelope the receipt goes out before any handler
//! code runs. A handler that takes seconds, or fails, never delays the
//! acknowledgment and never causes a redelivery.

use crate::application::tenants::TenantConnection;
use crate::domain::envelope::{CallbackEvent, EnvelopeClass, InboundEvent, RawEnvelope};

use super::{CommandDispatcher, DispatchError, DispatchOutcome, NotificationDispatcher};

/// Top-level router shared by every tenant's pump.
pub struct EventRouter {
    notifications: NotificationDispatcher,
    commands: CommandDispatcher,
}

impl EventRouter {
    pub fn new(notifications: NotificationDispatcher, commands: CommandDispatcher) -> Self {
        Self {
            notifications,
            commands,
        }
    }

    pub fn notifications(&self) -> &NotificationDispatcher {
        &self.notifications
    }

    pub fn commands(&self) -> &CommandDispatcher {
        &self.commands
    }

    /// Routes one envelope received on `connection`.
    ///
    /// A payload whose `team_id` differs from the connection's tenant is
    /// acknowledged but never dispatched, so no counter or reply crosses
    /// workspaces. Unrecognized classes are neither acknowledged nor dispatched. When the
    /// acknowledgment itself fails nothing is dispatched, so a redelivery is
    /// processed once.
    pub async fn dispatch(
        &self,
        envelope: &RawEnvelope,
        connection: &TenantConnection,
    ) -> Result<DispatchOutcome, DispatchError> {
        let class = envelope.class();
        if !class.is_recognized() {
            tracing::trace!(
                tenant_id = %connection.tenant_id(),
                envelope_id = %envelope.envelope_id,
                kind = %envelope.kind,
                "Ignoring unrecognized envelope"
            );
            return Ok(DispatchOutcome::Ignored);
        }

        connection.acknowledge(&envelope.envelope_id).await?;

        let event = match envelope.decode() {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(
                    tenant_id = %connection.tenant_id(),
                    envelope_id = %envelope.envelope_id,
                    error = %e,
                    "Dropping envelope"
                );
                return Ok(DispatchOutcome::Dropped);
            }
        };

        // Every socket of the app can carry any installed workspace's events.
        if let Some(team_id) = event.team_id() {
            if team_id != connection.tenant_id().as_str() {
                tracing::warn!(
                    tenant_id = %connection.tenant_id(),
                    envelope_id = %envelope.envelope_id,
                    payload_team_id = %team_id,
                    "Dropping envelope for another workspace"
                );
                return Ok(DispatchOutcome::Misrouted);
            }
        }

        match event {
            InboundEvent::Notification(callback) => match callback.event {
                CallbackEvent::Message(message) => {
                    self.notifications.dispatch(connection, &message).await
                }
                CallbackEvent::Other => Ok(DispatchOutcome::Ignored),
            },
            InboundEvent::Command(command) => self.commands.dispatch(connection, &command).await,
            InboundEvent::Unrecognized(_) => Ok(DispatchOutcome::Ignored),
        }
    }

    /// Whether `class` would reach a dispatcher.
    pub fn routes(&self, class: EnvelopeClass) -> bool {
        class == self.notifications.class() || class == self.commands.class()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{InMemoryEventStream, InMemoryTransport};
    use crate::application::registry::{EventHandler, HandlerRegistry};
    use crate::domain::envelope::{MessageEvent, SlashCommand};
    use crate::domain::foundation::{EnvelopeId, TenantId};
    use crate::domain::tenant::TenantCredentials;
    use crate::ports::TransportFactory;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    /// Records how many acks had been sent when it ran.
    struct Probe {
        name: &'static str,
        stream: Arc<InMemoryEventStream>,
        acks_seen: Mutex<Vec<usize>>,
    }

    impl Probe {
        fn new(name: &'static str, stream: Arc<InMemoryEventStream>) -> Arc<Self> {
            Arc::new(Self {
                name,
                stream,
                acks_seen: Mutex::new(Vec::new()),
            })
        }

        fn acks_seen(&self) -> Vec<usize> {
            self.acks_seen.lock().unwrap().clone()
        }

        fn record(&self) {
            self.acks_seen.lock().unwrap().push(self.stream.acknowledged().len());
        }
    }

    #[async_trait]
    impl EventHandler<MessageEvent> for Probe {
        fn name(&self) -> &'static str {
            self.name
        }

        fn matches(&self, text: &str) -> bool {
            text.contains("++")
        }

        async fn handle(&self, _c: &TenantConnection, _p: &MessageEvent) -> Result<(), DispatchError> {
            self.record();
            Err(DispatchError::InvalidArgument("handler failed".to_string()))
        }
    }

    #[async_trait]
    impl EventHandler<SlashCommand> for Probe {
        fn name(&self) -> &'static str {
            self.name
        }

        fn matches(&self, text: &str) -> bool {
            text == "/kudos"
        }

        async fn handle(&self, _c: &TenantConnection, _p: &SlashCommand) -> Result<(), DispatchError> {
            self.record();
            Ok(())
        }
    }

    struct Fixture {
        router: EventRouter,
        connection: TenantConnection,
        stream: Arc<InMemoryEventStream>,
        message_probe: Arc<Probe>,
        command_probe: Arc<Probe>,
    }

    fn fixture() -> Fixture {
        let transport = InMemoryTransport::new();
        let creds = TenantCredentials::new(TenantId::new("T1").unwrap(), "Acme", "xoxb-1");
        let connection = TenantConnection::new(
            creds.tenant_id.clone(),
            "Acme",
            transport.event_stream(&creds).unwrap(),
            transport.chat_api(&creds).unwrap(),
        );
        let stream = transport.stream(&creds.tenant_id).unwrap();

        let message_probe = Probe::new("message_probe", Arc::clone(&stream));
        let command_probe = Probe::new("command_probe", Arc::clone(&stream));
        let router = EventRouter::new(
            NotificationDispatcher::notifications(
                HandlerRegistry::<MessageEvent>::builder()
                    .register(message_probe.clone())
                    .build(),
            ),
            CommandDispatcher::commands(
                HandlerRegistry::<SlashCommand>::builder()
                    .register(command_probe.clone())
                    .build(),
            ),
        );

        Fixture {
            router,
            connection,
            stream,
            message_probe,
            command_probe,
        }
    }

    fn message_envelope(id: &str, text: &str) -> RawEnvelope {
        RawEnvelope::new(
            id,
            "events_api",
            json!({"team_id": "T1", "event": {"type": "message", "channel": "C1", "user": "U1", "text": text}}),
        )
    }

    #[tokio::test]
    async fn ack_is_sent_before_handler_runs_even_when_handler_fails() {
        let f = fixture();
        let result = f
            .router
            .dispatch(&message_envelope("e-1", "<@U2> ++"), &f.connection)
            .await;

        assert!(matches!(result, Err(DispatchError::InvalidArgument(_))));
        assert_eq!(f.message_probe.acks_seen(), vec![1]);
        assert_eq!(f.stream.acknowledged(), vec![EnvelopeId::new("e-1")]);
    }

    #[tokio::test]
    async fn commands_route_to_command_dispatcher() {
        let f = fixture();
        let envelope = RawEnvelope::new(
            "e-2",
            "slash_commands",
            json!({"command": "/kudos", "text": "3", "channel_id": "C1"}),
        );

        let outcome = f.router.dispatch(&envelope, &f.connection).await.unwrap();

        assert_eq!(outcome, DispatchOutcome::Handled { handler: "command_probe" });
        assert_eq!(f.command_probe.acks_seen(), vec![1]);
        assert!(f.message_probe.acks_seen().is_empty());
    }

    #[tokio::test]
    async fn unrecognized_class_is_not_acknowledged() {
        let f = fixture();
        let envelope = RawEnvelope::new("e-3", "interactive", json!({}));

        let outcome = f.router.dispatch(&envelope, &f.connection).await.unwrap();

        assert_eq!(outcome, DispatchOutcome::Ignored);
        assert!(f.stream.acknowledged().is_empty());
    }

    #[tokio::test]
    async fn malformed_payload_is_acknowledged_then_dropped() {
        let f = fixture();
        let envelope = RawEnvelope::new("e-4", "slash_commands", json!({"text": "no command"}));

        let outcome = f.router.dispatch(&envelope, &f.connection).await.unwrap();

        assert_eq!(outcome, DispatchOutcome::Dropped);
        assert_eq!(f.stream.acknowledged(), vec![EnvelopeId::new("e-4")]);
        assert!(f.command_probe.acks_seen().is_empty());
    }

    #[tokio::test]
    async fn non_message_notification_is_acknowledged_and_ignored() {
        let f = fixture();
        let envelope = RawEnvelope::new(
            "e-5",
            "events_api",
            json!({"event": {"type": "reaction_added", "reaction": "tada"}}),
        );

        let outcome = f.router.dispatch(&envelope, &f.connection).await.unwrap();

        assert_eq!(outcome, DispatchOutcome::Ignored);
        assert_eq!(f.stream.acknowledged().len(), 1);
    }

    #[tokio::test]
    async fn unmatched_message_is_acknowledged() {
        let f = fixture();
        let outcome = f
            .router
            .dispatch(&message_envelope("e-6", "just chatting"), &f.connection)
            .await
            .unwrap();

        assert_eq!(outcome, DispatchOutcome::Unmatched);
        assert_eq!(f.stream.acknowledged().len(), 1);
    }

    #[tokio::test]
    async fn message_for_another_workspace_is_acknowledged_but_not_dispatched() {
        let f = fixture();
        let envelope = RawEnvelope::new(
            "e-7",
            "events_api",
            json!({"team_id": "T2", "event": {"type": "message", "channel": "C-T2", "user": "U1", "text": "<@U9> ++"}}),
        );

        let outcome = f.router.dispatch(&envelope, &f.connection).await.unwrap();

        assert_eq!(outcome, DispatchOutcome::Misrouted);
        assert_eq!(f.stream.acknowledged(), vec![EnvelopeId::new("e-7")]);
        assert!(f.message_probe.acks_seen().is_empty());
    }

    #[tokio::test]
    async fn command_for_another_workspace_is_not_dispatched() {
        let f = fixture();
        let envelope = RawEnvelope::new(
            "e-8",
            "slash_commands",
            json!({"command": "/kudos", "text": "", "channel_id": "C-T2", "team_id": "T2"}),
        );

        let outcome = f.router.dispatch(&envelope, &f.connection).await.unwrap();

        assert_eq!(outcome, DispatchOutcome::Misrouted);
        assert!(f.command_probe.acks_seen().is_empty());
    }

    #[tokio::test]
    async fn command_naming_own_workspace_is_dispatched() {
        let f = fixture();
        let envelope = RawEnvelope::new(
            "e-9",
            "slash_commands",
            json!({"command": "/kudos", "text": "", "channel_id": "C1", "team_id": "T1"}),
        );

        let outcome = f.router.dispatch(&envelope, &f.connection).await.unwrap();

        assert_eq!(outcome, DispatchOutcome::Handled { handler: "command_probe" });
    }

    #[test]
    fn router_routes_both_recognized_classes() {
        let f = fixture();
        assert!(f.router.routes(EnvelopeClass::Notification));
        assert!(f.router.routes(EnvelopeClass::Command));
        assert!(!f.router.routes(EnvelopeClass::Unrecognized));
    }
}
