//! A single subject's collected views.

use std::collections::BTreeMap;
use std::sync::RwLock;

use panorama_types::{ObserverId, SubjectId, View};

/// The union of all observers' views about one subject.
///
/// Handed out by [`crate::Store::get_panorama`] as `Arc<Panorama>` so callers
/// can read or iterate its views without copying them; callers must acquire
/// the panorama's own lock before iterating. The single `RwLock` here
/// guards both the `views` mapping and each view's observation sequence.
pub struct Panorama {
    /// The subject this panorama is about.
    pub subject: SubjectId,
    /// Per-observer views, behind the panorama's own lock.
    pub views: RwLock<BTreeMap<ObserverId, View>>,
}

impl Panorama {
    /// Construct an empty panorama for `subject`.
    pub fn new(subject: SubjectId) -> Self {
        Panorama {
            subject,
            views: RwLock::new(BTreeMap::new()),
        }
    }
}
