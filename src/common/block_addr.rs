//! Block address type.

use std::fmt;

use super::config::HEADER_SIZE;

/// Byte offset of a tree block inside the index file.
///
/// Blocks are addressed by raw file offset rather than by block number, so a
/// valid address is always `HEADER_SIZE + n * block_size` for some `n`.
/// Offset 0 is the header, which is why 0 doubles as the null address.
///
/// # Example
/// ```
/// use blocktree::BlockAddr;
///
/// let addr = BlockAddr::new(20);
/// assert!(addr.is_valid());
/// assert!(!BlockAddr::NULL.is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockAddr(pub u64);

impl BlockAddr {
    /// "No block": empty tree root, end of free list, unused child slot.
    pub const NULL: BlockAddr = BlockAddr(0);

    /// Address of the first block, immediately after the header.
    pub const FIRST: BlockAddr = BlockAddr(HEADER_SIZE as u64);

    /// Create a new BlockAddr.
    #[inline]
    pub fn new(offset: u64) -> Self {
        BlockAddr(offset)
    }

    /// Check if this address points at a block (is not the null sentinel).
    #[inline]
    pub fn is_valid(&self) -> bool {
        *self != Self::NULL
    }

    /// File offset of this block.
    #[inline]
    pub fn offset(&self) -> u64 {
        self.0
    }

    /// Check that this address sits on a block boundary for `block_size`.
    pub fn is_aligned(&self, block_size: u32) -> bool {
        self.0 >= HEADER_SIZE as u64 && (self.0 - HEADER_SIZE as u64) % block_size as u64 == 0
    }
}

impl fmt::Display for BlockAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::NULL {
            write!(f, "Block(NULL)")
        } else {
            write!(f, "Block({})", self.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_addr_new() {
        let addr = BlockAddr::new(80);
        assert_eq!(addr.offset(), 80);
        assert!(addr.is_valid());
    }

    #[test]
    fn test_block_addr_null() {
        assert!(!BlockAddr::NULL.is_valid());
        assert_eq!(BlockAddr::FIRST.offset(), 20);
    }

    #[test]
    fn test_block_addr_alignment() {
        assert!(BlockAddr::new(20).is_aligned(60));
        assert!(BlockAddr::new(80).is_aligned(60));
        assert!(!BlockAddr::new(81).is_aligned(60));
        assert!(!BlockAddr::NULL.is_aligned(60));
    }

    #[test]
    fn test_block_addr_display() {
        assert_eq!(format!("{}", BlockAddr::new(20)), "Block(20)");
        assert_eq!(format!("{}", BlockAddr::NULL), "Block(NULL)");
    }
}
