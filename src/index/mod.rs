//! Index structures.
//!
//! - [`btree`] - The on-disk B-tree
//! - [`SharedIndex`] - A lockable handle for callers that share one index

pub mod btree;
mod shared;

pub use btree::{BTreeIndex, IndexStats, StatsSnapshot, TreeSummary};
pub use shared::SharedIndex;
