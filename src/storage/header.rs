//! Index file header.
//!
//! The first [`HEADER_SIZE`] bytes of the file hold the [`TreeHeader`]:
//! the root block, the head of the free list, and the block size the file
//! was created with.

use crate::common::config::{HEADER_SIZE, MAX_BLOCK_SIZE, MIN_BLOCK_SIZE};
use crate::common::{BlockAddr, Error, Result};

/// Persistent tree metadata stored at offset 0.
///
/// # Layout (20 bytes, big-endian)
/// ```text
/// Offset  Size  Field
/// ------  ----  -----
/// 0       8     root_addr  (0 = empty tree)
/// 8       8     free_addr  (0 = empty free list)
/// 16      4     block_size
/// ```
///
/// The header is read once at open and rewritten on flush/close; between
/// those points the live values are fields of the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeHeader {
    /// Root block of the tree.
    pub root: BlockAddr,
    /// First block on the free list.
    pub free: BlockAddr,
    /// Size of every block in bytes. Never changes after creation.
    pub block_size: u32,
}

impl TreeHeader {
    /// Size of the header in bytes.
    pub const SIZE: usize = HEADER_SIZE;

    /// Offset of each field within the header.
    pub const OFFSET_ROOT: usize = 0;
    pub const OFFSET_FREE: usize = 8;
    pub const OFFSET_BLOCK_SIZE: usize = 16;

    /// Header for a freshly created, empty tree.
    pub fn new(block_size: u32) -> Self {
        Self {
            root: BlockAddr::NULL,
            free: BlockAddr::NULL,
            block_size,
        }
    }

    /// Read a header from the beginning of a byte slice.
    ///
    /// # Errors
    /// `Error::Corrupted` if the slice is too short or an address is
    /// negative in its signed on-disk form.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < Self::SIZE {
            return Err(Error::corrupted(format!(
                "header needs {} bytes, file has {}",
                Self::SIZE,
                data.len()
            )));
        }

        let root = read_addr(data, Self::OFFSET_ROOT)?;
        let free = read_addr(data, Self::OFFSET_FREE)?;

        let mut size_bytes = [0u8; 4];
        size_bytes.copy_from_slice(&data[Self::OFFSET_BLOCK_SIZE..Self::OFFSET_BLOCK_SIZE + 4]);
        let block_size = i32::from_be_bytes(size_bytes);
        if block_size < 0 {
            return Err(Error::corrupted(format!("negative block size {}", block_size)));
        }

        Ok(Self {
            root,
            free,
            block_size: block_size as u32,
        })
    }

    /// Serialize the header into its 20-byte on-disk form.
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut buffer = [0u8; HEADER_SIZE];
        buffer[Self::OFFSET_ROOT..Self::OFFSET_ROOT + 8]
            .copy_from_slice(&(self.root.offset() as i64).to_be_bytes());
        buffer[Self::OFFSET_FREE..Self::OFFSET_FREE + 8]
            .copy_from_slice(&(self.free.offset() as i64).to_be_bytes());
        buffer[Self::OFFSET_BLOCK_SIZE..Self::OFFSET_BLOCK_SIZE + 4]
            .copy_from_slice(&(self.block_size as i32).to_be_bytes());
        buffer
    }

    /// Check the header against the file it was read from.
    ///
    /// Block size must be within the accepted range, and both pointers must
    /// be null or land on a block boundary inside the file.
    pub fn validate(&self, file_len: u64) -> Result<()> {
        if !(MIN_BLOCK_SIZE..=MAX_BLOCK_SIZE).contains(&self.block_size) {
            return Err(Error::InvalidBlockSize(self.block_size));
        }
        for (name, addr) in [("root", self.root), ("free list head", self.free)] {
            if !addr.is_valid() {
                continue;
            }
            if !addr.is_aligned(self.block_size)
                || addr.offset() + self.block_size as u64 > file_len
            {
                return Err(Error::corrupted(format!(
                    "{} {} is not a block inside a {}-byte file",
                    name, addr, file_len
                )));
            }
        }
        Ok(())
    }
}

fn read_addr(data: &[u8], offset: usize) -> Result<BlockAddr> {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&data[offset..offset + 8]);
    let raw = i64::from_be_bytes(bytes);
    if raw < 0 {
        return Err(Error::corrupted(format!("negative block address {}", raw)));
    }
    Ok(BlockAddr::new(raw as u64))
}

// ============================================================================
// TESTS
// ============================================================================
