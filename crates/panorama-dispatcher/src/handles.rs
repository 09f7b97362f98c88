//! The `Register` capability table.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::RwLock;

use panorama_types::{Handle, ObserverId, HANDLE_START};

struct Inner {
    by_key: BTreeMap<(String, ObserverId), Handle>,
    valid: BTreeSet<Handle>,
    next_handle: Handle,
}

/// Assigns and validates capability handles.
///
/// A `(module, observer)` pair always maps to the same handle once
/// registered: `register` is idempotent and returns the existing handle on
/// a repeat call. Holds a single `RwLock` over a plain map, the same
/// discipline this workspace's other lock-guarded registries use
/// (`panorama-store`'s watchlist, `panorama-exchange`'s client cache)
/// rather than anything lock-free.
pub struct HandleTable {
    inner: RwLock<Inner>,
}

impl HandleTable {
    /// An empty table, handing out handles starting at `HANDLE_START`.
    pub fn new() -> Self {
        HandleTable {
            inner: RwLock::new(Inner {
                by_key: BTreeMap::new(),
                valid: BTreeSet::new(),
                next_handle: HANDLE_START,
            }),
        }
    }

    /// Return `(module, observer)`'s handle. The second element of the
    /// tuple is `true` iff this call assigned a fresh one.
    pub fn register(&self, module: &str, observer: &ObserverId) -> (Handle, bool) {
        let key = (module.to_string(), observer.clone());
        {
            let inner = self
                .inner
                .read()
                .expect("panorama-dispatcher handle table lock poisoned");
            if let Some(&handle) = inner.by_key.get(&key) {
                return (handle, false);
            }
        }
        let mut inner = self
            .inner
            .write()
            .expect("panorama-dispatcher handle table lock poisoned");
        if let Some(&handle) = inner.by_key.get(&key) {
            return (handle, false);
        }
        let handle = inner.next_handle;
        inner.next_handle += 1;
        inner.by_key.insert(key, handle);
        inner.valid.insert(handle);
        (handle, true)
    }

    /// Whether `handle` was ever issued by [`HandleTable::register`].
    pub fn is_valid(&self, handle: Handle) -> bool {
        self.inner
            .read()
            .expect("panorama-dispatcher handle table lock poisoned")
            .valid
            .contains(&handle)
    }
}

impl Default for HandleTable {
    fn default() -> Self {
        HandleTable::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registering_the_same_key_twice_returns_the_same_handle() {
        let table = HandleTable::new();
        let (h1, first) = table.register("agent", &ObserverId::new("FE_1"));
        assert!(first);
        let (h2, second) = table.register("agent", &ObserverId::new("FE_1"));
        assert!(!second);
        assert_eq!(h1, h2);
    }

    #[test]
    fn distinct_keys_get_distinct_handles() {
        let table = HandleTable::new();
        let (h1, _) = table.register("agent", &ObserverId::new("FE_1"));
        let (h2, _) = table.register("agent", &ObserverId::new("FE_2"));
        assert_ne!(h1, h2);
    }

    #[test]
    fn handles_start_at_the_configured_floor() {
        let table = HandleTable::new();
        let (h, _) = table.register("agent", &ObserverId::new("FE_1"));
        assert_eq!(h, HANDLE_START);
    }

    #[test]
    fn unregistered_handle_is_invalid() {
        let table = HandleTable::new();
        assert!(!table.is_valid(HANDLE_START));
        table.register("agent", &ObserverId::new("FE_1"));
        assert!(table.is_valid(HANDLE_START));
    }
}
