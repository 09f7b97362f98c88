//! The per-subject memoization workbook.

use std::collections::BTreeMap;
use std::sync::RwLock;

use panorama_types::{Observation, ObserverId, SubjectId};

/// Maps subject → observer → memoized view summary.
///
/// Populated lazily during panorama folding; invalidated entry-wise by
/// `InferReport` (only the submitting observer's entry) or wholesale by
/// `InferSubject` (the whole subject).
#[derive(Default)]
pub struct Workbook {
    entries: RwLock<BTreeMap<SubjectId, BTreeMap<ObserverId, Observation>>>,
}

impl Workbook {
    /// An empty workbook.
    pub fn new() -> Self {
        Workbook::default()
    }

    /// Drop every cached summary for `subject`.
    pub fn clear_subject(&self, subject: &SubjectId) {
        self.entries
            .write()
            .expect("panorama-inference workbook lock poisoned")
            .remove(subject);
    }

    /// Drop only `observer`'s cached summary for `subject`, leaving the rest
    /// of the subject's workbook intact.
    pub fn invalidate(&self, subject: &SubjectId, observer: &ObserverId) {
        if let Some(entry) = self
            .entries
            .write()
            .expect("panorama-inference workbook lock poisoned")
            .get_mut(subject)
        {
            entry.remove(observer);
        }
    }

    /// A cloned cached summary, if one exists.
    pub fn get(&self, subject: &SubjectId, observer: &ObserverId) -> Option<Observation> {
        self.entries
            .read()
            .expect("panorama-inference workbook lock poisoned")
            .get(subject)
            .and_then(|m| m.get(observer).cloned())
    }

    /// Cache a freshly computed summary.
    pub fn insert(&self, subject: &SubjectId, observer: ObserverId, summary: Observation) {
        self.entries
            .write()
            .expect("panorama-inference workbook lock poisoned")
            .entry(subject.clone())
            .or_default()
            .insert(observer, summary);
    }
}
