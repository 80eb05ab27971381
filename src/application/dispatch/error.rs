//! Errors surfaced while dispatching one envelope.

use thiserror::Error;

use crate::domain::foundation::DomainError;
use crate::ports::TransportError;

/// Failure of a single dispatch. Never fatal to the pump.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Storage or credential failure (includes "workspace not set up")
    #[error("{0}")]
    Domain(#[from] DomainError),

    /// Acknowledgment or outbound send failed
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Handler rejected the event's argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl DispatchError {
    pub fn is_unknown_tenant(&self) -> bool {
        matches!(self, DispatchError::Domain(e) if e.is_unknown_tenant())
    }
}

/// What happened to an envelope that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A handler claimed and processed the event
    Handled { handler: &'static str },
    /// Recognized class, but no registered handler matched
    Unmatched,
    /// Unrecognized class or uninteresting inner event; not acknowledged
    /// when the class itself is unrecognized
    Ignored,
    /// Payload did not decode for its class; acknowledged, then discarded
    Dropped,
    /// Payload names a different workspace than the connection it arrived
    /// on; acknowledged, then discarded
    Misrouted,
}
