//! TTL-based caches.
//!
//! Two structures share a TTL notion: each item carries an expiry computed
//! at insertion time. Both wrap their state in a single `std::sync::RwLock`
//! guarding an inner struct, the same way `tor-chanmgr`'s `ChannelMap` wraps
//! a `Mutex<Inner>` "to limit the amount of code that can see and lock the
//! mutex". These are blocking locks held only across plain data-structure
//! operations, never across an `.await`.

mod list_cache;
mod ttl_cache;

pub use list_cache::ListCache;
pub use ttl_cache::Cache;
