//! Tree node representation and the block codec.
//!
//! On disk the node kind is carried by the sign of the count field:
//! `count > 0` is an internal node, `count < 0` a leaf, `count == 0` a free
//! block. In memory the kinds are separate variants so tree code never
//! looks at signs.

use crate::common::config::{ADDR_SIZE, COUNT_SIZE, KEY_SIZE};
use crate::common::{BlockAddr, Error, RecordAddr, Result};

use super::layout::BlockLayout;

/// Leaf node: sorted keys, one payload address per key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeafNode {
    pub keys: Vec<i32>,
    pub values: Vec<RecordAddr>,
}

impl LeafNode {
    /// Leaf holding a single entry.
    pub fn single(key: i32, value: RecordAddr) -> Self {
        Self {
            keys: vec![key],
            values: vec![value],
        }
    }

    /// Insert in sorted order. The key must not already be present.
    pub fn insert(&mut self, key: i32, value: RecordAddr) {
        let pos = self.keys.partition_point(|&k| k < key);
        self.keys.insert(pos, key);
        self.values.insert(pos, value);
    }

    /// Remove `key`, shifting later entries left.
    pub fn remove(&mut self, key: i32) -> Option<RecordAddr> {
        let pos = self.keys.binary_search(&key).ok()?;
        self.keys.remove(pos);
        Some(self.values.remove(pos))
    }

    /// Payload stored for `key`.
    pub fn get(&self, key: i32) -> Option<RecordAddr> {
        self.keys
            .binary_search(&key)
            .ok()
            .map(|pos| self.values[pos])
    }
}

/// Internal node: `keys.len()` separators over `keys.len() + 1` children.
///
/// Every key in `children[i]` is `>= keys[i-1]` and `< keys[i]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InternalNode {
    pub keys: Vec<i32>,
    pub children: Vec<BlockAddr>,
}

impl InternalNode {
    /// Root created when the old root splits.
    pub fn new_root(left: BlockAddr, separator: i32, right: BlockAddr) -> Self {
        Self {
            keys: vec![separator],
            children: vec![left, right],
        }
    }

    /// Slot of `child` in the children array.
    pub fn child_slot(&self, child: BlockAddr) -> Option<usize> {
        self.children.iter().position(|&c| c == child)
    }

    /// Child to descend into when looking for `key`.
    pub fn route(&self, key: i32) -> usize {
        self.keys
            .iter()
            .position(|&k| key < k)
            .unwrap_or(self.keys.len())
    }
}

/// A live tree node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Leaf(LeafNode),
    Internal(InternalNode),
}

impl Node {
    /// Number of keys held.
    pub fn len(&self) -> usize {
        self.keys().len()
    }

    /// Whether the node holds no keys.
    pub fn is_empty(&self) -> bool {
        self.keys().is_empty()
    }

    /// Whether this is a leaf.
    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf(_))
    }

    /// Sorted keys.
    pub fn keys(&self) -> &[i32] {
        match self {
            Node::Leaf(leaf) => &leaf.keys,
            Node::Internal(internal) => &internal.keys,
        }
    }

    /// Signed count as stored on disk.
    pub fn count(&self) -> i32 {
        match self {
            Node::Leaf(leaf) => -(leaf.keys.len() as i32),
            Node::Internal(internal) => internal.keys.len() as i32,
        }
    }

    /// Serialize into exactly `layout.block_size()` bytes.
    ///
    /// Unused key and child slots, and the padding, are zero.
    pub fn encode(&self, layout: &BlockLayout) -> Vec<u8> {
        let mut buf = vec![0u8; layout.block_size() as usize];
        buf[..COUNT_SIZE].copy_from_slice(&self.count().to_be_bytes());

        for (slot, key) in self.keys().iter().enumerate() {
            let at = layout.key_offset(slot);
            buf[at..at + KEY_SIZE].copy_from_slice(&key.to_be_bytes());
        }

        let addrs: Vec<u64> = match self {
            Node::Leaf(leaf) => leaf.values.iter().map(RecordAddr::get).collect(),
            Node::Internal(internal) => internal.children.iter().map(BlockAddr::offset).collect(),
        };
        for (slot, addr) in addrs.into_iter().enumerate() {
            let at = layout.child_offset(slot);
            buf[at..at + ADDR_SIZE].copy_from_slice(&(addr as i64).to_be_bytes());
        }

        buf
    }
}

/// Any block in the file: a live node or a free-list record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Node(Node),
    Free { next: BlockAddr },
}

impl Block {
    /// Serialize a free-list record: a zero count, the next pointer, zeros.
    pub fn encode_free(next: BlockAddr, layout: &BlockLayout) -> Vec<u8> {
        let mut buf = vec![0u8; layout.block_size() as usize];
        buf[COUNT_SIZE..COUNT_SIZE + ADDR_SIZE]
            .copy_from_slice(&(next.offset() as i64).to_be_bytes());
        buf
    }

    /// Decode a block read from disk.
    ///
    /// Only slots in use are read; the rest are ignored, so two nodes with
    /// the same entries compare equal regardless of leftover bytes.
    ///
    /// # Errors
    /// `Error::Corrupted` if the buffer is shorter than a block or the
    /// count does not fit the layout.
    pub fn decode(buf: &[u8], layout: &BlockLayout) -> Result<Self> {
        if buf.len() < layout.block_size() as usize {
            return Err(Error::corrupted(format!(
                "block buffer of {} bytes, expected {}",
                buf.len(),
                layout.block_size()
            )));
        }

        let count = i32::from_be_bytes(read_array(buf, 0));
        if count == 0 {
            let next = u64::from_be_bytes(read_array(buf, COUNT_SIZE));
            return Ok(Block::Free {
                next: BlockAddr::new(next),
            });
        }

        let len = count.unsigned_abs() as usize;
        if len > layout.max_keys() {
            return Err(Error::corrupted(format!(
                "node count {} exceeds {} keys",
                count,
                layout.max_keys()
            )));
        }

        let keys: Vec<i32> = (0..len)
            .map(|slot| i32::from_be_bytes(read_array(buf, layout.key_offset(slot))))
            .collect();
        let addr_at = |slot: usize| u64::from_be_bytes(read_array(buf, layout.child_offset(slot)));

        let node = if count < 0 {
            Node::Leaf(LeafNode {
                keys,
                values: (0..len).map(|slot| RecordAddr::new(addr_at(slot))).collect(),
            })
        } else {
            Node::Internal(InternalNode {
                keys,
                children: (0..=len).map(|slot| BlockAddr::new(addr_at(slot))).collect(),
            })
        };
        Ok(Block::Node(node))
    }
}

fn read_array<const N: usize>(buf: &[u8], at: usize) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&buf[at..at + N]);
    out
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> BlockLayout {
        BlockLayout::new(60).unwrap()
    }

    #[test]
    fn test_leaf_insert_sorted() {
        let mut leaf = LeafNode::default();
        leaf.insert(5, RecordAddr::new(50));
        leaf.insert(1, RecordAddr::new(10));
        leaf.insert(3, RecordAddr::new(30));

        assert_eq!(leaf.keys, vec![1, 3, 5]);
        assert_eq!(leaf.values, vec![RecordAddr(10), RecordAddr(30), RecordAddr(50)]);
        assert_eq!(leaf.get(3), Some(RecordAddr(30)));
        assert_eq!(leaf.get(4), None);
    }

    #[test]
    fn test_leaf_remove_shifts() {
        let mut leaf = LeafNode::default();
        for k in [1, 2, 3] {
            leaf.insert(k, RecordAddr::new(k as u64 * 10));
        }
        assert_eq!(leaf.remove(2), Some(RecordAddr(20)));
        assert_eq!(leaf.remove(2), None);
        assert_eq!(leaf.keys, vec![1, 3]);
        assert_eq!(leaf.values, vec![RecordAddr(10), RecordAddr(30)]);
    }

    #[test]
    fn test_internal_route() {
        let node = InternalNode {
            keys: vec![10, 20],
            children: vec![BlockAddr(20), BlockAddr(80), BlockAddr(140)],
        };
        assert_eq!(node.route(5), 0);
        assert_eq!(node.route(10), 1);
        assert_eq!(node.route(19), 1);
        assert_eq!(node.route(20), 2);
        assert_eq!(node.route(99), 2);
        assert_eq!(node.child_slot(BlockAddr(140)), Some(2));
        assert_eq!(node.child_slot(BlockAddr(200)), None);
    }

    #[test]
    fn test_leaf_byte_layout() {
        let node = Node::Leaf(LeafNode {
            keys: vec![7, 9],
            values: vec![RecordAddr(0x0A), RecordAddr(0x0B)],
        });
        let buf = node.encode(&layout());

        assert_eq!(buf.len(), 60);
        assert_eq!(&buf[0..4], &(-2i32).to_be_bytes());
        assert_eq!(&buf[4..8], &[0, 0, 0, 7]);
        assert_eq!(&buf[8..12], &[0, 0, 0, 9]);
        // Unused key slots are zero
        assert!(buf[12..20].iter().all(|&b| b == 0));
        assert_eq!(buf[27], 0x0A);
        assert_eq!(buf[35], 0x0B);
        assert!(buf[36..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_internal_byte_layout() {
        let node = Node::Internal(InternalNode::new_root(BlockAddr(20), 4, BlockAddr(80)));
        let buf = node.encode(&layout());

        assert_eq!(&buf[0..4], &1i32.to_be_bytes());
        assert_eq!(&buf[4..8], &4i32.to_be_bytes());
        assert_eq!(&buf[20..28], &20i64.to_be_bytes());
        assert_eq!(&buf[28..36], &80i64.to_be_bytes());
        assert!(buf[36..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_free_byte_layout() {
        let buf = Block::encode_free(BlockAddr(140), &layout());
        assert_eq!(&buf[0..4], &[0, 0, 0, 0]);
        assert_eq!(&buf[4..12], &140i64.to_be_bytes());
        assert!(buf[12..].iter().all(|&b| b == 0));

        assert_eq!(
            Block::decode(&buf, &layout()).unwrap(),
            Block::Free { next: BlockAddr(140) }
        );
    }

    #[test]
    fn test_decode_ignores_stale_slots() {
        let node = Node::Leaf(LeafNode::single(3, RecordAddr(33)));
        let mut buf = node.encode(&layout());
        // Garbage in an unused key slot and an unused address slot
        buf[10] = 0xFF;
        buf[40] = 0xFF;

        assert_eq!(Block::decode(&buf, &layout()).unwrap(), Block::Node(node));
    }

    #[test]
    fn test_decode_internal() {
        let node = Node::Internal(InternalNode {
            keys: vec![10, 20, 30, 40],
            children: (1..=5).map(|i| BlockAddr(i * 60 + 20)).collect(),
        });
        let buf = node.encode(&layout());
        assert_eq!(Block::decode(&buf, &layout()).unwrap(), Block::Node(node));
    }

    #[test]
    fn test_decode_rejects_oversized_count() {
        let mut buf = vec![0u8; 60];
        buf[0..4].copy_from_slice(&(-5i32).to_be_bytes());
        assert!(matches!(
            Block::decode(&buf, &layout()),
            Err(Error::Corrupted(_))
        ));
    }

    #[test]
    fn test_decode_rejects_short_buffer() {
        assert!(Block::decode(&[0u8; 12], &layout()).is_err());
    }
}
