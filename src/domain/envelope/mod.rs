//! Inbound envelopes and their classification.
//!
//! The transport hands over [`RawEnvelope`]s. Classification by type tag
//! happens once, at the router, producing a strongly-typed [`InboundEvent`]
//! so dispatchers never inspect untyped payloads.

use serde::Deserialize;
use std::fmt;

use crate::domain::foundation::EnvelopeId;

/// Type tag of notification-class envelopes.
pub const NOTIFICATION_TAG: &str = "events_api";
/// Type tag of command-class envelopes.
pub const COMMAND_TAG: &str = "slash_commands";

/// One envelope exactly as delivered by a tenant's stream.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawEnvelope {
    pub envelope_id: EnvelopeId,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub payload: serde_json::Value,
    #[serde(default)]
    pub retry_attempt: u32,
}

impl RawEnvelope {
    pub fn new(envelope_id: impl Into<String>, kind: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            envelope_id: EnvelopeId::new(envelope_id),
            kind: kind.into(),
            payload,
            retry_attempt: 0,
        }
    }

    /// Classifies by type tag alone; the payload is not inspected.
    pub fn class(&self) -> EnvelopeClass {
        EnvelopeClass::from_tag(&self.kind)
    }

    /// Decodes the payload into the typed event for its class.
    pub fn decode(&self) -> Result<InboundEvent, DecodeError> {
        let class = self.class();
        let malformed = |source| DecodeError::Malformed { class, source };

        match class {
            EnvelopeClass::Notification => {
                let callback = EventCallback::deserialize(&self.payload).map_err(malformed)?;
                Ok(InboundEvent::Notification(callback))
            }
            EnvelopeClass::Command => {
                let command = SlashCommand::deserialize(&self.payload).map_err(malformed)?;
                Ok(InboundEvent::Command(command))
            }
            EnvelopeClass::Unrecognized => Ok(InboundEvent::Unrecognized(self.kind.clone())),
        }
    }
}

/// The two event taxonomies plus everything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnvelopeClass {
    Notification,
    Command,
    Unrecognized,
}

impl EnvelopeClass {
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            NOTIFICATION_TAG => EnvelopeClass::Notification,
            COMMAND_TAG => EnvelopeClass::Command,
            _ => EnvelopeClass::Unrecognized,
        }
    }

    /// Recognized classes must be acknowledged before dispatch.
    pub fn is_recognized(&self) -> bool {
        !matches!(self, EnvelopeClass::Unrecognized)
    }
}

impl fmt::Display for EnvelopeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EnvelopeClass::Notification => "notification",
            EnvelopeClass::Command => "command",
            EnvelopeClass::Unrecognized => "unrecognized",
        };
        write!(f, "{}", s)
    }
}

/// Payload does not match the shape expected for its class.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("malformed {class} payload: {source}")]
    Malformed {
        class: EnvelopeClass,
        #[source]
        source: serde_json::Error,
    },
}

/// A classified, decoded envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    Notification(EventCallback),
    Command(SlashCommand),
    Unrecognized(String),
}

impl InboundEvent {
    /// Workspace the payload says it belongs to, when it says so.
    pub fn team_id(&self) -> Option<&str> {
        match self {
            InboundEvent::Notification(callback) => callback.team_id.as_deref(),
            InboundEvent::Command(command) => command.team_id.as_deref(),
            InboundEvent::Unrecognized(_) => None,
        }
    }
}

/// Payload of a notification-class envelope.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EventCallback {
    #[serde(default)]
    pub team_id: Option<String>,
    pub event: CallbackEvent,
}

/// Inner event of a notification. Only messages are acted upon.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CallbackEvent {
    Message(MessageEvent),
    #[serde(other)]
    Other,
}

/// A message posted in a channel the bot can see.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MessageEvent {
    pub channel: String,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub ts: Option<String>,
    #[serde(default)]
    pub subtype: Option<String>,
}

/// Payload of a command-class envelope.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SlashCommand {
    pub command: String,
    #[serde(default)]
    pub text: String,
    pub channel_id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub team_id: Option<String>,
}

/// Text a handler's match predicate is evaluated against.
pub trait MatchText {
    fn match_text(&self) -> &str;
}

impl MatchText for MessageEvent {
    fn match_text(&self) -> &str {
        &self.text
    }
}

impl MatchText for SlashCommand {
    fn match_text(&self) -> &str {
        &self.command
    }
}
