//! Configuration constants for the on-disk index format.

/// Size of the file header in bytes.
///
/// # Layout
/// ```text
/// Offset  Size  Field
/// ------  ----  -----
/// 0       8     root_addr  (i64, big-endian, 0 = empty tree)
/// 8       8     free_addr  (i64, big-endian, 0 = empty free list)
/// 16      4     block_size (i32, big-endian)
/// ```
pub const HEADER_SIZE: usize = 20;

/// Bytes used by the signed count at the start of every block.
pub const COUNT_SIZE: usize = 4;

/// Bytes per key slot.
pub const KEY_SIZE: usize = 4;

/// Bytes per child / payload address slot.
pub const ADDR_SIZE: usize = 8;

/// Bytes one unit of order costs: one key, one address, and an equal share
/// of the count header (`4 + 4*(order-1) + 8*order = 12*order`).
pub const SLOT_COST: usize = KEY_SIZE + ADDR_SIZE;

/// Smallest accepted block size.
///
/// 48 bytes gives order 4 and `min_keys` 1. Anything smaller yields
/// `min_keys == 0`, which would let a non-root leaf drain to a count of
/// zero and become indistinguishable from a free block.
pub const MIN_BLOCK_SIZE: u32 = 48;

/// Largest accepted block size (1 MiB).
pub const MAX_BLOCK_SIZE: u32 = 1 << 20;

/// Block size used by [`BTreeIndex::create_default`](crate::BTreeIndex::create_default).
///
/// 4092 = 12 × 341, so a 4 KiB-ish block with no padding.
pub const DEFAULT_BLOCK_SIZE: u32 = 4092;
