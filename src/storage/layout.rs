//! Block geometry derived from the block size.

use crate::common::config::{
    ADDR_SIZE, COUNT_SIZE, KEY_SIZE, MAX_BLOCK_SIZE, MIN_BLOCK_SIZE, SLOT_COST,
};
use crate::common::{Error, Result};

/// Geometry shared by every block in one index file.
///
/// # Block Layout
/// ```text
/// ┌─────────┬──────────────────┬────────────────────┬─────────┐
/// │ count   │ keys             │ children           │ padding │
/// │ i32     │ i32 × (order-1)  │ i64 × order        │ bs % 12 │
/// └─────────┴──────────────────┴────────────────────┴─────────┘
/// ```
///
/// `order = block_size / 12`; a node holds at most `order - 1` keys, and a
/// non-root node must keep at least `min_keys = order/2 - 1`.
///
/// # Example
/// ```
/// use blocktree::storage::BlockLayout;
///
/// let layout = BlockLayout::new(60).unwrap();
/// assert_eq!(layout.order(), 5);
/// assert_eq!(layout.max_keys(), 4);
/// assert_eq!(layout.min_keys(), 1);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockLayout {
    block_size: u32,
    order: usize,
}

impl BlockLayout {
    /// Derive the layout for `block_size`.
    ///
    /// # Errors
    /// `Error::InvalidBlockSize` outside `MIN_BLOCK_SIZE..=MAX_BLOCK_SIZE`.
    pub fn new(block_size: u32) -> Result<Self> {
        if !(MIN_BLOCK_SIZE..=MAX_BLOCK_SIZE).contains(&block_size) {
            return Err(Error::InvalidBlockSize(block_size));
        }
        Ok(Self {
            block_size,
            order: block_size as usize / SLOT_COST,
        })
    }

    /// Size of every block in bytes.
    #[inline]
    pub fn block_size(&self) -> u32 {
        self.block_size
    }

    /// Maximum number of children of an internal node.
    #[inline]
    pub fn order(&self) -> usize {
        self.order
    }

    /// Maximum number of keys in any node.
    #[inline]
    pub fn max_keys(&self) -> usize {
        self.order - 1
    }

    /// Minimum number of keys in a non-root node.
    #[inline]
    pub fn min_keys(&self) -> usize {
        self.order / 2 - 1
    }

    /// Trailing zero bytes after the child array.
    #[inline]
    pub fn padding(&self) -> usize {
        self.block_size as usize % SLOT_COST
    }

    #[inline]
    pub(crate) fn key_offset(&self, slot: usize) -> usize {
        COUNT_SIZE + slot * KEY_SIZE
    }

    #[inline]
    pub(crate) fn child_offset(&self, slot: usize) -> usize {
        COUNT_SIZE + self.max_keys() * KEY_SIZE + slot * ADDR_SIZE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_derivation() {
        let layout = BlockLayout::new(60).unwrap();
        assert_eq!(layout.order(), 5);
        assert_eq!(layout.min_keys(), 1);
        assert_eq!(layout.padding(), 0);

        let layout = BlockLayout::new(100).unwrap();
        assert_eq!(layout.order(), 8);
        assert_eq!(layout.max_keys(), 7);
        assert_eq!(layout.min_keys(), 3);
        assert_eq!(layout.padding(), 4);
    }

    #[test]
    fn test_offsets() {
        let layout = BlockLayout::new(60).unwrap();
        assert_eq!(layout.key_offset(0), 4);
        assert_eq!(layout.key_offset(3), 16);
        assert_eq!(layout.child_offset(0), 20);
        // Last child slot ends exactly at the block boundary
        assert_eq!(layout.child_offset(4) + ADDR_SIZE, 60);
    }

    #[test]
    fn test_rejects_tiny_blocks() {
        assert!(matches!(
            BlockLayout::new(47),
            Err(Error::InvalidBlockSize(47))
        ));
        assert!(BlockLayout::new(48).is_ok());
    }
}
