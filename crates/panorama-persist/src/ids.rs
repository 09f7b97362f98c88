//! Row-id allocation for the append-only tables.

use std::sync::atomic::{AtomicU64, Ordering};

/// Hands out monotonically increasing row ids, starting at 1 — the
/// equivalent of the source schema's `INTEGER PRIMARY KEY` autoincrement
/// column, reimplemented here since we write flat files instead of opening
/// a real SQL engine.
#[derive(Debug, Default)]
pub struct RowIdAllocator {
    next: AtomicU64,
}

impl RowIdAllocator {
    /// Construct an allocator that will hand out `1, 2, 3, ...`.
    pub fn new() -> Self {
        RowIdAllocator {
            next: AtomicU64::new(1),
        }
    }

    /// Allocate the next row id.
    pub fn next(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_monotonic_starting_at_one() {
        let alloc = RowIdAllocator::new();
        assert_eq!(alloc.next(), 1);
        assert_eq!(alloc.next(), 2);
        assert_eq!(alloc.next(), 3);
    }
}
