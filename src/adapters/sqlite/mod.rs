//! SQLite adapters - Database implementations of the storage ports.
//!
//! - `SqliteStore` - Workspace credentials and kudos counters

mod store;

pub use store::SqliteStore;
