//! Absolute, nanosecond-precision timestamps.

use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// An absolute point in time, stored as nanoseconds since the Unix epoch.
///
/// Observations carry one of these instead of a relative duration so that
/// ordering and garbage collection are well defined regardless of when a
/// report happens to be processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct Timestamp(u128);

impl Timestamp {
    /// The current wall-clock time.
    pub fn now() -> Self {
        let dur = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO);
        Timestamp(dur.as_nanos())
    }

    /// Construct a timestamp from a raw nanosecond count since the epoch.
    pub fn from_nanos(nanos: u128) -> Self {
        Timestamp(nanos)
    }

    /// The raw nanosecond count since the epoch.
    pub fn as_nanos(&self) -> u128 {
        self.0
    }

    /// Time elapsed from `self` to `other`; zero if `other` is not after
    /// `self`.
    pub fn saturating_duration_since(&self, other: Timestamp) -> Duration {
        if self.0 >= other.0 {
            Duration::from_nanos(((self.0 - other.0).min(u128::from(u64::MAX))) as u64)
        } else {
            Duration::ZERO
        }
    }

    /// `self - duration`, saturating at the epoch.
    pub fn saturating_sub(&self, duration: Duration) -> Timestamp {
        Timestamp(self.0.saturating_sub(duration.as_nanos()))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ns", self.0)
    }
}
