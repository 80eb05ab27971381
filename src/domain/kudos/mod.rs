//! Kudos domain module.
//!
//! # Module Structure
//!
//! - `trigger` - Recognising `<@user> ++` grants in message text
//! - `leaderboard` - Counters, `/kudos` argument parsing, reply text

mod leaderboard;
mod trigger;

pub use leaderboard::{
    kudos_granted_reply, leaderboard_reply, parse_limit, InvalidLimit, KudosCount,
    DEFAULT_LEADERBOARD_SIZE, INVALID_NUMBER_REPLY, NO_KUDOS_YET_REPLY,
    WORKSPACE_NOT_SET_UP_REPLY,
};
pub use trigger::{extract_recipient, is_kudos_trigger};
