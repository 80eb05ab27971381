//! In-memory adapters.
//!
//! - `InMemoryStore` - Credential and counter store without a database
//! - `InMemoryTransport` - Scriptable Slack transport for testing

mod store;
mod transport;

pub use store::InMemoryStore;
pub use transport::{InMemoryEventStream, InMemoryTransport, RecordingChatApi, SentMessage};
