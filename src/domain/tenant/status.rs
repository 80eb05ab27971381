//! ConnectionStatus enum for tracking the lifecycle of a tenant connection.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a live tenant connection.
///
/// A tenant with no entry in the manager is absent and has no status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    #[default]
    Connecting,
    Running,
    /// Transport session failed; registered but receiving no traffic.
    Disconnected,
    /// Removed from the manager; in-flight work may still finish.
    Draining,
}

impl ConnectionStatus {
    /// Validates a transition from this status to another.
    ///
    /// Valid transitions:
    /// - Connecting -> Running | Disconnected | Draining
    /// - Running -> Disconnected | Draining
    /// - Disconnected -> Draining
    pub fn can_transition_to(&self, target: &ConnectionStatus) -> bool {
        use ConnectionStatus::*;
        matches!(
            (self, target),
            (Connecting, Running)
                | (Connecting, Disconnected)
                | (Connecting, Draining)
                | (Running, Disconnected)
                | (Running, Draining)
                | (Disconnected, Draining)
        )
    }

    pub fn is_live(&self) -> bool {
        matches!(self, ConnectionStatus::Connecting | ConnectionStatus::Running)
    }

    pub(crate) fn as_u8(self) -> u8 {
        match self {
            ConnectionStatus::Connecting => 0,
            ConnectionStatus::Running => 1,
            ConnectionStatus::Disconnected => 2,
            ConnectionStatus::Draining => 3,
        }
    }

    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            1 => ConnectionStatus::Running,
            2 => ConnectionStatus::Disconnected,
            3 => ConnectionStatus::Draining,
            _ => ConnectionStatus::Connecting,
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Running => "running",
            ConnectionStatus::Disconnected => "disconnected",
            ConnectionStatus::Draining => "draining",
        };
        write!(f, "{}", s)
    }
}
