//! Handler registry - ordered, first-match handler lists.
//!
//! One registry exists per event class. Registration order is fixed when the
//! registry is built and every dispatch scans it from the front: the first
//! handler whose predicate accepts the event's match text runs, and no other.
//! An event nobody claims is not an error.

use std::sync::Arc;

use async_trait::async_trait;

use crate::application::dispatch::{DispatchError, DispatchOutcome};
use crate::application::tenants::TenantConnection;
use crate::domain::envelope::MatchText;

/// A (match predicate, action) pair for payloads of type `P`.
#[async_trait]
pub trait EventHandler<P>: Send + Sync {
    /// Stable name for logs.
    fn name(&self) -> &'static str;

    /// Whether this handler claims an event with the given match text.
    fn matches(&self, text: &str) -> bool;

    /// Processes a claimed event for the tenant behind `connection`.
    async fn handle(&self, connection: &TenantConnection, payload: &P)
        -> Result<(), DispatchError>;
}

/// Immutable ordered list of handlers for one event class.
pub struct HandlerRegistry<P> {
    handlers: Vec<Arc<dyn EventHandler<P>>>,
}

impl<P> HandlerRegistry<P>
where
    P: MatchText + Send + Sync,
{
    pub fn builder() -> HandlerRegistryBuilder<P> {
        HandlerRegistryBuilder {
            handlers: Vec::new(),
        }
    }

    /// The first handler in registration order that claims `text`.
    pub fn first_match(&self, text: &str) -> Option<&Arc<dyn EventHandler<P>>> {
        self.handlers.iter().find(|handler| handler.matches(text))
    }

    /// Runs the first matching handler and propagates its error.
    pub async fn dispatch(
        &self,
        connection: &TenantConnection,
        payload: &P,
    ) -> Result<DispatchOutcome, DispatchError> {
        match self.first_match(payload.match_text()) {
            Some(handler) => {
                handler.handle(connection, payload).await?;
                Ok(DispatchOutcome::Handled {
                    handler: handler.name(),
                })
            }
            None => Ok(DispatchOutcome::Unmatched),
        }
    }

    /// Handler names in registration order.
    pub fn names(&self) -> Vec<&'static str> {
        self.handlers.iter().map(|h| h.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

/// Collects handlers in the order they will be consulted.
pub struct HandlerRegistryBuilder<P> {
    handlers: Vec<Arc<dyn EventHandler<P>>>,
}

impl<P> HandlerRegistryBuilder<P>
where
    P: MatchText + Send + Sync,
{
    pub fn register(mut self, handler: Arc<dyn EventHandler<P>>) -> Self {
        self.handlers.push(handler);
        self
    }

    pub fn build(self) -> HandlerRegistry<P> {
        HandlerRegistry {
            handlers: self.handlers,
        }
    }
}
