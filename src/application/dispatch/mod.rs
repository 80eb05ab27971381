//! Envelope dispatch: the top-level router and its two class dispatchers.

mod class_dispatcher;
mod error;
mod router;

pub use class_dispatcher::{ClassDispatcher, CommandDispatcher, NotificationDispatcher};
pub use error::{DispatchError, DispatchOutcome};
pub use router::EventRouter;
