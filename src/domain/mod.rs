//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, timestamps, errors)
//! - `tenant` - Workspace credentials and connection status
//! - `envelope` - Inbound envelope classification and typed payloads
//! - `kudos` - Kudos triggers, counters, and leaderboard text

pub mod envelope;
pub mod foundation;
pub mod kudos;
pub mod tenant;
