//! Block allocator backed by an intrusive free list.
//!
//! Released blocks are overwritten with a free-list record pointing at the
//! previous head, so the list lives entirely inside the file:
//!
//! ```text
//! header.free ──▶ [0 | next] ──▶ [0 | next] ──▶ [0 | 0]
//! ```
//!
//! The file never shrinks. Allocation pops the head, or hands out the end
//! of the file when the list is empty.

use tracing::trace;

use crate::common::{BlockAddr, Error, Result};

use super::block_file::BlockFile;
use super::layout::BlockLayout;
use super::node::Block;

/// Free-list allocator for tree blocks.
///
/// Holds only the head pointer; the links are read from and written to the
/// [`BlockFile`] passed into each call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreeList {
    head: BlockAddr,
}

impl FreeList {
    /// Allocator whose list starts at `head` (`BlockAddr::NULL` for empty).
    pub fn new(head: BlockAddr) -> Self {
        Self { head }
    }

    /// Current head of the list.
    #[inline]
    pub fn head(&self) -> BlockAddr {
        self.head
    }

    /// Whether every allocation will extend the file.
    #[inline]
    pub fn is_empty(&self) -> bool {
        !self.head.is_valid()
    }

    /// Hand out a block address.
    ///
    /// With an empty list this is the current end of file; the caller must
    /// write a full block there before allocating again.
    ///
    /// # Errors
    /// `Error::Corrupted` if the head block is not a free-list record.
    pub fn allocate(&mut self, file: &mut BlockFile, layout: &BlockLayout) -> Result<BlockAddr> {
        if !self.head.is_valid() {
            let addr = BlockAddr::new(file.len());
            trace!(addr = addr.offset(), "allocate: extend file");
            return Ok(addr);
        }

        let addr = self.head;
        let buf = file.read_block(addr, layout.block_size() as usize)?;
        match Block::decode(&buf, layout)? {
            Block::Free { next } => {
                self.head = next;
                trace!(addr = addr.offset(), next = next.offset(), "allocate: reuse free block");
                Ok(addr)
            }
            Block::Node(_) => Err(Error::corrupted(format!(
                "free list head {} holds a live node",
                addr
            ))),
        }
    }

    /// Return `addr` to the list, overwriting its contents.
    pub fn release(
        &mut self,
        file: &mut BlockFile,
        layout: &BlockLayout,
        addr: BlockAddr,
    ) -> Result<()> {
        file.write_block(addr, &Block::encode_free(self.head, layout))?;
        trace!(addr = addr.offset(), next = self.head.offset(), "release block");
        self.head = addr;
        Ok(())
    }

    /// Addresses on the list, head first.
    ///
    /// Stops with `Error::Corrupted` after more hops than the file has
    /// blocks, which means the list loops.
    pub fn walk(&self, file: &mut BlockFile, layout: &BlockLayout) -> Result<Vec<BlockAddr>> {
        let max_blocks = file.len() / layout.block_size() as u64;
        let mut out = Vec::new();
        let mut cursor = self.head;

        while cursor.is_valid() {
            if out.len() as u64 >= max_blocks {
                return Err(Error::corrupted("free list has a cycle"));
            }
            let buf = file.read_block(cursor, layout.block_size() as usize)?;
            let Block::Free { next } = Block::decode(&buf, layout)? else {
                return Err(Error::corrupted(format!(
                    "free list entry {} holds a live node",
                    cursor
                )));
            };
            out.push(cursor);
            cursor = next;
        }
        Ok(out)
    }
}
