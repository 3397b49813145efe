//! blocktree - A disk-resident B-tree index stored as fixed-size blocks in a
//! single file.
//!
//! Keys are `i32`; each key carries the address of a record kept elsewhere.
//! Nodes are read from disk on every access and written back as soon as
//! they change, so the file is the only copy of the tree.
//!
//! # Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                           blocktree                             │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │              Index Layer (index/)                        │   │
//! │  │   BTreeIndex: search | insert | remove | range_search    │   │
//! │  │   SharedIndex (one lock around one index)                │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │           Storage Layer (storage/)                       │   │
//! │  │   BlockFile + TreeHeader + BlockLayout + node codec      │   │
//! │  │   FreeList (released blocks, reused LIFO)                │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # File Format
//! ```text
//! [ header: root i64 | free i64 | block_size i32 ]  20 bytes
//! [ block @ 20 ][ block @ 20+bs ][ block @ 20+2bs ] ...
//!
//! block: count i32 | keys i32 × (order-1) | addrs i64 × order | pad
//!        count < 0  leaf with |count| keys
//!        count > 0  internal node with count keys
//!        count = 0  free block; first addr links to the next free one
//! ```
//! All integers are big-endian. `order = block_size / 12`.
//!
//! # Modules
//! - [`common`] - Shared primitives (BlockAddr, RecordAddr, Error, config)
//! - [`storage`] - Block I/O, header, node encoding, free list
//! - [`index`] - The B-tree and its shared handle
//!
//! # Quick Start
//! ```no_run
//! use blocktree::{BTreeIndex, RecordAddr};
//!
//! let mut index = BTreeIndex::create("my_index.tree", 60)?;
//! for key in 0..24 {
//!     index.insert(key, RecordAddr::new(1000 + key as u64))?;
//! }
//! index.remove(7)?;
//!
//! let hits = index.range_search(5, 9)?;
//! assert_eq!(hits.len(), 4);
//! index.close()?;
//!
//! let mut index = BTreeIndex::open("my_index.tree")?;
//! assert_eq!(index.search(8)?, Some(RecordAddr::new(1008)));
//! # Ok::<(), blocktree::Error>(())
//! ```

pub mod common;
pub mod index;
pub mod storage;

// Re-export commonly used items at crate root for convenience
pub use common::config::{DEFAULT_BLOCK_SIZE, MAX_BLOCK_SIZE, MIN_BLOCK_SIZE};
pub use common::{BlockAddr, Error, RecordAddr, Result};

pub use index::{BTreeIndex, IndexStats, SharedIndex, StatsSnapshot, TreeSummary};
pub use storage::{BlockLayout, TreeHeader};
