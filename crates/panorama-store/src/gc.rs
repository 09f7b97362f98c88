//! The result of a garbage-collection sweep.

use std::collections::BTreeMap;

use panorama_types::SubjectId;

/// How many observations `Store::gc` reaped, per subject. Only subjects that
/// actually lost observations are present.
pub type GcReport = BTreeMap<SubjectId, usize>;
