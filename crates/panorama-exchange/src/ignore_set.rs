//! A per-subject set of peers to skip when propagating.

use std::collections::BTreeSet;
use std::sync::RwLock;

use panorama_types::PeerId;

/// The set of peers that should not be sent reports about one subject.
///
/// Each ignore-set gets its own lock, separate from the outer
/// subject→ignore-set mapping's lock, so testing membership for one
/// subject never contends with updates to another's.
#[derive(Default)]
pub struct IgnoreSet {
    entries: RwLock<BTreeSet<PeerId>>,
}

impl IgnoreSet {
    /// An empty ignore-set.
    pub fn new() -> Self {
        IgnoreSet::default()
    }

    /// Whether `peer` is currently ignored.
    pub fn contains(&self, peer: &PeerId) -> bool {
        self.entries
            .read()
            .expect("panorama-exchange ignore-set lock poisoned")
            .contains(peer)
    }

    /// Add `peer` to the ignore-set.
    pub fn insert(&self, peer: PeerId) {
        self.entries
            .write()
            .expect("panorama-exchange ignore-set lock poisoned")
            .insert(peer);
    }

    /// Remove `peer` from the ignore-set. Returns `true` iff it was present.
    pub fn remove(&self, peer: &PeerId) -> bool {
        self.entries
            .write()
            .expect("panorama-exchange ignore-set lock poisoned")
            .remove(peer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_then_contains_then_remove() {
        let set = IgnoreSet::new();
        let peer = PeerId::new("B");
        assert!(!set.contains(&peer));
        set.insert(peer.clone());
        assert!(set.contains(&peer));
        assert!(set.remove(&peer));
        assert!(!set.contains(&peer));
    }
}
