//! A bounded, TTL-expiring key-value map (`Cache`).

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::RwLock;
use std::time::{Duration, Instant};

/// Above this many live entries, [`Cache::set`] opportunistically sweeps for
/// expired ones instead of waiting for a reader to trip over them.
const SWEEP_WATERMARK: usize = 50;

/// The maximum number of expired entries a single sweep removes.
const SWEEP_BATCH: usize = 100;

struct Entry<V> {
    value: V,
    expires_at: Instant,
}

impl<V> Entry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

struct Inner<K, V> {
    items: HashMap<K, Entry<V>>,
}

/// A bounded, expiring key-value store.
///
/// `get` never returns an expired value: it deletes expired entries it
/// encounters on the read path instead of just hiding them.
pub struct Cache<K, V> {
    inner: RwLock<Inner<K, V>>,
}

impl<K, V> Default for Cache<K, V>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Cache::new()
    }
}

impl<K, V> Cache<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Construct an empty cache.
    pub fn new() -> Self {
        Cache {
            inner: RwLock::new(Inner {
                items: HashMap::new(),
            }),
        }
    }

    /// Insert or replace `key` with `value`, expiring at `now + ttl`.
    ///
    /// Once the cache crosses [`SWEEP_WATERMARK`] live entries this also
    /// sweeps up to [`SWEEP_BATCH`] expired entries, so a cache that's
    /// mostly `set` and rarely `get` doesn't grow unboundedly with garbage.
    pub fn set(&self, key: K, value: V, ttl: Duration) {
        let now = Instant::now();
        let mut inner = self.inner.write().expect("panorama-cache lock poisoned");
        inner.items.insert(
            key,
            Entry {
                value,
                expires_at: now + ttl,
            },
        );
        if inner.items.len() > SWEEP_WATERMARK {
            sweep_locked(&mut inner, now);
        }
    }

    /// Delete a key unconditionally.
    pub fn delete(&self, key: &K) {
        let mut inner = self.inner.write().expect("panorama-cache lock poisoned");
        inner.items.remove(key);
    }

    /// Remove every entry.
    pub fn clear(&self) {
        let mut inner = self.inner.write().expect("panorama-cache lock poisoned");
        inner.items.clear();
    }

    /// The number of entries currently stored, including any not yet swept
    /// expired entries.
    pub fn len(&self) -> usize {
        self.inner.read().expect("panorama-cache lock poisoned").items.len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K, V> Cache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Fetch `key`'s value if present and not expired.
    ///
    /// Takes the read-lock fast path first; only escalates to the write
    /// lock if the entry it found turned out to be expired.
    pub fn get(&self, key: &K) -> Option<V> {
        let now = Instant::now();
        {
            let inner = self.inner.read().expect("panorama-cache lock poisoned");
            match inner.items.get(key) {
                None => return None,
                Some(entry) if !entry.is_expired(now) => return Some(entry.value.clone()),
                Some(_) => {} // expired; fall through to escalate
            }
        }
        let mut inner = self.inner.write().expect("panorama-cache lock poisoned");
        match inner.items.get(key) {
            Some(entry) if entry.is_expired(now) => {
                inner.items.remove(key);
                None
            }
            Some(entry) => Some(entry.value.clone()),
            None => None,
        }
    }
}

fn sweep_locked<K: Eq + Hash + Clone, V>(inner: &mut Inner<K, V>, now: Instant) {
    let expired: Vec<K> = inner
        .items
        .iter()
        .filter(|(_, entry)| entry.is_expired(now))
        .take(SWEEP_BATCH)
        .map(|(k, _)| k.clone())
        .collect();
    for key in expired {
        inner.items.remove(&key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_returns_live_value() {
        let cache: Cache<&str, i32> = Cache::new();
        cache.set("a", 1, Duration::from_secs(60));
        assert_eq!(cache.get(&"a"), Some(1));
    }

    #[test]
    fn get_deletes_and_returns_none_for_expired() {
        let cache: Cache<&str, i32> = Cache::new();
        cache.set("a", 1, Duration::from_millis(0));
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(cache.get(&"a"), None);
        assert_eq!(cache.len(), 0, "expired entry should have been deleted on read");
    }

    #[test]
    fn delete_and_clear() {
        let cache: Cache<&str, i32> = Cache::new();
        cache.set("a", 1, Duration::from_secs(60));
        cache.set("b", 2, Duration::from_secs(60));
        cache.delete(&"a");
        assert_eq!(cache.get(&"a"), None);
        assert_eq!(cache.get(&"b"), Some(2));
        cache.clear();
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn watermark_sweep_removes_expired_entries() {
        let cache: Cache<u32, u32> = Cache::new();
        for i in 0..SWEEP_WATERMARK as u32 {
            cache.set(i, i, Duration::from_millis(0));
        }
        std::thread::sleep(Duration::from_millis(5));
        // Crossing the watermark triggers a sweep of already-expired entries.
        cache.set(9999, 9999, Duration::from_secs(60));
        assert!(cache.len() <= 2, "sweep should have cleared the expired batch");
    }
}
