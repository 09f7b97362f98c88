//! The concurrency-safe observation store.
//!
//! Holds the watchlist of subjects under observation and, per subject, a
//! [`Panorama`] of bounded per-observer [`View`](panorama_types::View)s.
//! Mirrors `tor-chanmgr`'s two-tier locking: a small top-level lock over the
//! watchlist and subject→panorama mapping, and a separate lock per panorama
//! so that appending an observation never blocks an unrelated subject's
//! readers.

mod gc;
mod panorama;
mod store;

pub use gc::GcReport;
pub use panorama::Panorama;
pub use store::Store;
