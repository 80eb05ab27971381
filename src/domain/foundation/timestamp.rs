//! Timestamp value object for immutable points in time.

use chrono::{DateTime, Duration, TimeDelta, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Immutable point in time, always UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Creates a timestamp for the current moment.
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Creates a timestamp from a DateTime<Utc>.
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Returns the inner DateTime.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Checks if this timestamp is before another.
    pub fn is_before(&self, other: &Timestamp) -> bool {
        self.0 < other.0
    }

    /// Returns the duration from another timestamp to this one.
    ///
    /// Returns negative duration if other is after self.
    pub fn duration_since(&self, other: &Timestamp) -> Duration {
        self.0.signed_duration_since(other.0)
    }

    /// Creates a timestamp from Unix seconds, `None` when out of range.
    pub fn from_unix_secs(secs: i64) -> Option<Self> {
        Utc.timestamp_opt(secs, 0).single().map(Self)
    }

    /// Returns the timestamp as Unix seconds.
    pub fn as_unix_secs(&self) -> i64 {
        self.0.timestamp()
    }

    /// Adds `secs`, or `None` when the result is outside the representable range.
    pub fn checked_plus_secs(&self, secs: i64) -> Option<Self> {
        TimeDelta::try_seconds(secs)
            .and_then(|delta| self.0.checked_add_signed(delta))
            .map(Self)
    }

    /// Adds `secs`, saturating at the representable range.
    pub fn plus_secs(&self, secs: i64) -> Self {
        self.checked_plus_secs(secs).unwrap_or(if secs < 0 {
            Self(DateTime::<Utc>::MIN_UTC)
        } else {
            Self(DateTime::<Utc>::MAX_UTC)
        })
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::now()
    }
}
