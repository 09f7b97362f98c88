//! Memoized view summarization and panorama folding.
//!
//! [`fold`] holds the pure math (no locks, no channels); [`Engine`] wraps it
//! with the memoization workbook, the bounded work queues, and the
//! background worker task.

mod engine;
mod fold;
mod workbook;

pub use engine::{Engine, QUEUE_CAPACITY};
pub use fold::{contributing_observers, fold_summaries, summarize_view};
pub use workbook::Workbook;
