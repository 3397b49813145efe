//! Storage layer - file I/O and block formats.
//!
//! This module handles persistent storage:
//! - [`BlockFile`] - Low-level file I/O
//! - [`TreeHeader`] - Root / free-list / block-size metadata at offset 0
//! - [`BlockLayout`] - Geometry derived from the block size
//! - [`node`] - Node types and the block codec
//! - [`FreeList`] - Block allocator

mod allocator;
mod block_file;
mod header;
mod layout;
pub mod node;

pub use allocator::FreeList;
pub use block_file::BlockFile;
pub use header::TreeHeader;
pub use layout::BlockLayout;
pub use node::{Block, InternalNode, LeafNode, Node};
