//! Index statistics tracking.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters maintained by a [`BTreeIndex`](super::BTreeIndex).
///
/// All fields are atomic so a snapshot can be taken through a shared
/// reference. `Ordering::Relaxed` is enough: counters are independent and
/// only read for reporting.
///
/// # Example
/// ```
/// use blocktree::IndexStats;
/// use std::sync::atomic::Ordering;
///
/// let stats = IndexStats::new();
/// stats.splits.fetch_add(1, Ordering::Relaxed);
/// assert_eq!(stats.snapshot().splits, 1);
/// ```
#[derive(Debug)]
pub struct IndexStats {
    /// Blocks read and decoded.
    pub blocks_read: AtomicU64,

    /// Blocks written (nodes and free-list records).
    pub blocks_written: AtomicU64,

    /// Blocks handed out by the allocator.
    pub allocations: AtomicU64,

    /// Allocations satisfied from the free list instead of growing the file.
    pub reused_blocks: AtomicU64,

    /// Blocks returned to the free list.
    pub releases: AtomicU64,

    /// Node splits during insert.
    pub splits: AtomicU64,

    /// Entries moved from a sibling during delete.
    pub borrows: AtomicU64,

    /// Node merges during delete.
    pub merges: AtomicU64,
}

impl IndexStats {
    /// Create a new stats tracker with all counters at zero.
    pub fn new() -> Self {
        Self {
            blocks_read: AtomicU64::new(0),
            blocks_written: AtomicU64::new(0),
            allocations: AtomicU64::new(0),
            reused_blocks: AtomicU64::new(0),
            releases: AtomicU64::new(0),
            splits: AtomicU64::new(0),
            borrows: AtomicU64::new(0),
            merges: AtomicU64::new(0),
        }
    }

    #[inline]
    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a snapshot of current statistics.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            blocks_read: self.blocks_read.load(Ordering::Relaxed),
            blocks_written: self.blocks_written.load(Ordering::Relaxed),
            allocations: self.allocations.load(Ordering::Relaxed),
            reused_blocks: self.reused_blocks.load(Ordering::Relaxed),
            releases: self.releases.load(Ordering::Relaxed),
            splits: self.splits.load(Ordering::Relaxed),
            borrows: self.borrows.load(Ordering::Relaxed),
            merges: self.merges.load(Ordering::Relaxed),
        }
    }

    /// Reset all counters to zero.
    pub fn reset(&self) {
        for counter in [
            &self.blocks_read,
            &self.blocks_written,
            &self.allocations,
            &self.reused_blocks,
            &self.releases,
            &self.splits,
            &self.borrows,
            &self.merges,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

impl Default for IndexStats {
    fn default() -> Self {
        Self::new()
    }
}

/// A point-in-time copy of [`IndexStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub blocks_read: u64,
    pub blocks_written: u64,
    pub allocations: u64,
    pub reused_blocks: u64,
    pub releases: u64,
    pub splits: u64,
    pub borrows: u64,
    pub merges: u64,
}

impl StatsSnapshot {
    /// Fraction of allocations served by the free list (0.0 to 1.0).
    pub fn reuse_rate(&self) -> f64 {
        if self.allocations == 0 {
            0.0
        } else {
            self.reused_blocks as f64 / self.allocations as f64
        }
    }
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Stats {{ reads: {}, writes: {}, allocs: {} ({:.2}% reused), releases: {}, splits: {}, borrows: {}, merges: {} }}",
            self.blocks_read,
            self.blocks_written,
            self.allocations,
            self.reuse_rate() * 100.0,
            self.releases,
            self.splits,
            self.borrows,
            self.merges
        )
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_stats_zero() {
        let stats = IndexStats::new();
        assert_eq!(stats.snapshot(), StatsSnapshot::default());
    }

    #[test]
    fn test_bump_and_reset() {
        let stats = IndexStats::new();
        IndexStats::bump(&stats.allocations);
        IndexStats::bump(&stats.allocations);
        IndexStats::bump(&stats.reused_blocks);

        let snap = stats.snapshot();
        assert_eq!(snap.allocations, 2);
        assert!((snap.reuse_rate() - 0.5).abs() < f64::EPSILON);

        stats.reset();
        assert_eq!(stats.snapshot().allocations, 0);
    }

    #[test]
    fn test_reuse_rate_no_allocations() {
        assert_eq!(StatsSnapshot::default().reuse_rate(), 0.0);
    }

    #[test]
    fn test_snapshot_display() {
        let snap = StatsSnapshot {
            allocations: 4,
            reused_blocks: 1,
            splits: 3,
            ..Default::default()
        };
        let text = format!("{}", snap);
        assert!(text.contains("allocs: 4 (25.00% reused)"));
        assert!(text.contains("splits: 3"));
    }
}
