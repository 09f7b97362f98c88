//! Reports: an observer's observation about a subject.

use crate::ids::{ObserverId, SubjectId};
use crate::Observation;

/// An `(observer, subject, observation)` tuple filed by an observer.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Report {
    /// Who is filing this report.
    pub observer: ObserverId,
    /// Who the report is about.
    pub subject: SubjectId,
    /// What was observed.
    pub observation: Observation,
}

impl Report {
    /// Construct a new report.
    pub fn new(observer: ObserverId, subject: SubjectId, observation: Observation) -> Self {
        Report {
            observer,
            subject,
            observation,
        }
    }
}

/// The outcome of `Store::add_report`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[non_exhaustive]
pub enum ReportOutcome {
    /// The report was stored (or, for `LearnReport`, otherwise accepted).
    Accepted,
    /// The subject was not on the watchlist and `filter` was requested.
    Ignored,
    /// Reserved for future unrecoverable errors (e.g. a malformed
    /// observation). Not produced by anything in this workspace today.
    Failed,
}
