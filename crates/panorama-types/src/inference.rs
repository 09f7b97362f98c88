//! The aggregated summary of a panorama.

use std::collections::BTreeSet;

use crate::ids::{ObserverId, SubjectId};
use crate::Observation;

/// The summarized health verdict for a subject, folded from all contributing
/// observers' views.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Inference {
    /// The subject this inference is about.
    pub subject: SubjectId,
    /// The observers that contributed to this inference.
    pub observers: BTreeSet<ObserverId>,
    /// The summarized observation.
    pub observation: Observation,
}

impl Inference {
    /// Construct a new inference.
    pub fn new(
        subject: SubjectId,
        observers: BTreeSet<ObserverId>,
        observation: Observation,
    ) -> Self {
        Inference {
            subject,
            observers,
            observation,
        }
    }
}
