//! Leaderboard argument parsing and reply text.

use std::fmt::Write;

use crate::domain::foundation::UserId;

/// Entries shown when `/kudos` is given no argument.
pub const DEFAULT_LEADERBOARD_SIZE: u32 = 5;

pub const INVALID_NUMBER_REPLY: &str = "Invalid number specified. Please enter a valid number.";
pub const NO_KUDOS_YET_REPLY: &str = "No kudos yet! Give someone kudos with `@user ++`.";
pub const WORKSPACE_NOT_SET_UP_REPLY: &str =
    "This workspace is not set up yet. Please reinstall the Kudos app.";

/// One user's running total within a workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KudosCount {
    pub user_id: UserId,
    pub count: u64,
}

impl KudosCount {
    pub fn new(user_id: UserId, count: u64) -> Self {
        Self { user_id, count }
    }
}

/// Reason a leaderboard argument was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid leaderboard size '{0}'")]
pub struct InvalidLimit(pub String);

/// Reads the entry limit from the command text.
///
/// Only the first whitespace-separated word is considered. An empty text
/// yields [`DEFAULT_LEADERBOARD_SIZE`]; anything but a positive integer is
/// rejected.
pub fn parse_limit(text: &str) -> Result<u32, InvalidLimit> {
    match text.split_whitespace().next() {
        None => Ok(DEFAULT_LEADERBOARD_SIZE),
        Some(arg) => match arg.parse::<u32>() {
            Ok(n) if n > 0 => Ok(n),
            _ => Err(InvalidLimit(arg.to_string())),
        },
    }
}

/// Reply after a kudos grant.
pub fn kudos_granted_reply(user_id: &UserId, count: u64) -> String {
    format!("<@{}> got a kudos! 🎉\n Now has {} kudos!", user_id, count)
}

/// Leaderboard reply, or the "no kudos yet" text for an empty board.
pub fn leaderboard_reply(limit: u32, entries: &[KudosCount]) -> String {
    if entries.is_empty() {
        return NO_KUDOS_YET_REPLY.to_string();
    }

    let mut reply = format!("Top {} kudos users:\n", limit);
    for entry in entries.iter().take(limit as usize) {
        let _ = writeln!(reply, "<@{}> - {} kudos", entry.user_id, entry.count);
    }
    reply
}
