//! Detection of kudos grants in free message text.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::foundation::UserId;

/// A user mention followed by `++`, e.g. `<@U123> ++`.
static KUDOS_TRIGGER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<@(\w+)>\s*\+\+").expect("kudos trigger pattern is valid"));

/// True when `text` contains a kudos grant.
pub fn is_kudos_trigger(text: &str) -> bool {
    KUDOS_TRIGGER.is_match(text)
}

/// The user receiving kudos: the mention of the first grant in `text`.
pub fn extract_recipient(text: &str) -> Option<UserId> {
    KUDOS_TRIGGER
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| UserId::new(m.as_str()).ok())
}
