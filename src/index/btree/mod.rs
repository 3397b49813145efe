//! Disk-resident B-tree index.
//!
//! Nodes are fixed-size blocks addressed by file offset. Leaves hold every
//! key with its payload address; internal nodes hold separators only.
//!
//! # Components
//! - [`BTreeIndex`] - The index handle and its lifecycle
//! - `path` - Root-to-leaf traversal and exact search
//! - `insert` - Insert with split propagation
//! - `delete` - Delete with borrow/merge rebalancing
//! - `range` - Inclusive range scan
//! - `verify` - Invariant checker and node dump
//! - [`IndexStats`] - Operation counters

mod delete;
mod insert;
mod path;
mod range;
mod stats;
mod tree;
mod verify;

pub use stats::{IndexStats, StatsSnapshot};
pub use tree::BTreeIndex;
pub use verify::TreeSummary;
