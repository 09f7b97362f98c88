//! The closed, totally ordered health status enumeration.

use std::fmt;

/// A subject's (or metric's) health status.
///
/// Variants are declared in ascending severity order: `INVALID < NA <
/// HEALTHY < MAYBE_UNHEALTHY < PENDING < UNHEALTHY < DYING < DEAD`.
/// `#[derive(Ord)]` then compares by declared order, so the ordinal
/// comparison falls out for free. Tie-breaks in the inference engine favor
/// the higher ordinal, i.e. the more severe status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[non_exhaustive]
pub enum Status {
    /// Placeholder for a status that could not be determined.
    Invalid,
    /// No assessment is available.
    Na,
    /// The subject appears healthy.
    Healthy,
    /// The subject might be unhealthy; treated as a weaker signal than
    /// `Unhealthy`.
    MaybeUnhealthy,
    /// A temporary, resolvable state. A later `Healthy` observation for
    /// the same metric consumes a `Pending` predecessor during view
    /// summarization.
    Pending,
    /// The subject appears unhealthy.
    Unhealthy,
    /// The subject is failing and likely to become unreachable.
    Dying,
    /// The subject is unreachable.
    Dead,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Status::Invalid => "INVALID",
            Status::Na => "NA",
            Status::Healthy => "HEALTHY",
            Status::MaybeUnhealthy => "MAYBE_UNHEALTHY",
            Status::Pending => "PENDING",
            Status::Unhealthy => "UNHEALTHY",
            Status::Dying => "DYING",
            Status::Dead => "DEAD",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::Status::*;

    #[test]
    fn ordinal_order_matches_declared_severity() {
        let ascending = [Invalid, Na, Healthy, MaybeUnhealthy, Pending, Unhealthy, Dying, Dead];
        for window in ascending.windows(2) {
            assert!(window[0] < window[1], "{:?} should be < {:?}", window[0], window[1]);
        }
    }

    #[test]
    fn severity_tie_break_picks_higher_ordinal() {
        assert!(Unhealthy > Healthy);
        assert_eq!(Unhealthy.max(Healthy), Unhealthy);
    }
}
