//! Shared handle to a single index.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::common::{RecordAddr, Result};

use super::btree::{BTreeIndex, StatsSnapshot, TreeSummary};

/// Cloneable handle that serializes calls to one [`BTreeIndex`].
///
/// The index itself has no internal locking; every call here takes the
/// mutex for its full duration, so operations never interleave. This is a
/// convenience for owners that share an index (for example a record store
/// and a maintenance task), not a concurrency layer.
///
/// # Example
/// ```no_run
/// use blocktree::{BTreeIndex, RecordAddr, SharedIndex};
///
/// let index = SharedIndex::new(BTreeIndex::create("t.tree", 60)?);
/// let other = index.clone();
/// other.insert(1, RecordAddr::new(100))?;
/// assert_eq!(index.search(1)?, Some(RecordAddr::new(100)));
/// # Ok::<(), blocktree::Error>(())
/// ```
#[derive(Clone)]
pub struct SharedIndex {
    inner: Arc<Mutex<BTreeIndex>>,
}

impl SharedIndex {
    /// Wrap an open index.
    pub fn new(index: BTreeIndex) -> Self {
        Self {
            inner: Arc::new(Mutex::new(index)),
        }
    }

    /// See [`BTreeIndex::insert`].
    pub fn insert(&self, key: i32, addr: RecordAddr) -> Result<bool> {
        self.inner.lock().insert(key, addr)
    }

    /// See [`BTreeIndex::search`].
    pub fn search(&self, key: i32) -> Result<Option<RecordAddr>> {
        self.inner.lock().search(key)
    }

    /// See [`BTreeIndex::remove`].
    pub fn remove(&self, key: i32) -> Result<Option<RecordAddr>> {
        self.inner.lock().remove(key)
    }

    /// See [`BTreeIndex::range_search`].
    pub fn range_search(&self, low: i32, high: i32) -> Result<Vec<RecordAddr>> {
        self.inner.lock().range_search(low, high)
    }

    /// See [`BTreeIndex::verify`].
    pub fn verify(&self) -> Result<TreeSummary> {
        self.inner.lock().verify()
    }

    /// See [`BTreeIndex::flush`].
    pub fn flush(&self) -> Result<()> {
        self.inner.lock().flush()
    }

    /// Copy of the index counters.
    pub fn stats(&self) -> StatsSnapshot {
        self.inner.lock().stats_snapshot()
    }

    /// Recover the index if this is the last handle, so it can be closed.
    ///
    /// Returns the handle back unchanged while other clones are alive.
    pub fn into_inner(self) -> std::result::Result<BTreeIndex, SharedIndex> {
        Arc::try_unwrap(self.inner)
            .map(Mutex::into_inner)
            .map_err(|inner| SharedIndex { inner })
    }
}
