//! Insert with split propagation.

use tracing::debug;

use crate::common::{BlockAddr, Error, RecordAddr, Result};
use crate::storage::{InternalNode, LeafNode, Node};

use super::stats::IndexStats;
use super::tree::BTreeIndex;

/// What the level below hands to the next level up.
enum Carry {
    /// The new entry, not yet placed (only before the leaf is handled, or
    /// when the tree is empty).
    Entry(i32, RecordAddr),
    /// The node at `left` split; `right` must be linked in after it with
    /// `separator` between them.
    Split {
        left: BlockAddr,
        separator: i32,
        right: BlockAddr,
    },
}

impl BTreeIndex {
    /// Insert `key` with payload `addr`.
    ///
    /// Returns `Ok(false)` without writing anything if `key` is already
    /// present.
    ///
    /// # Errors
    /// - `Error::NullRecordAddr` if `addr` is 0
    /// - I/O and corruption errors from reading or writing blocks
    pub fn insert(&mut self, key: i32, addr: RecordAddr) -> Result<bool> {
        if !addr.is_storable() {
            return Err(Error::NullRecordAddr);
        }

        let (mut path, found) = self.find_path(key)?;
        if found.is_some() {
            return Ok(false);
        }

        let max_keys = self.layout.max_keys();
        let mut carry = Carry::Entry(key, addr);

        while let Some(frame) = path.pop() {
            carry = match (frame.node, carry) {
                (Node::Leaf(mut leaf), Carry::Entry(key, value)) => {
                    leaf.insert(key, value);
                    if leaf.keys.len() <= max_keys {
                        self.write_node(frame.addr, &Node::Leaf(leaf))?;
                        return Ok(true);
                    }
                    self.split_leaf(frame.addr, leaf)?
                }
                (
                    Node::Internal(mut internal),
                    Carry::Split {
                        left,
                        separator,
                        right,
                    },
                ) => {
                    let slot = internal.child_slot(left).ok_or_else(|| {
                        Error::corrupted(format!("{} is not a child of {}", left, frame.addr))
                    })?;
                    internal.keys.insert(slot, separator);
                    internal.children.insert(slot + 1, right);
                    if internal.keys.len() <= max_keys {
                        self.write_node(frame.addr, &Node::Internal(internal))?;
                        return Ok(true);
                    }
                    self.split_internal(frame.addr, internal)?
                }
                _ => {
                    return Err(Error::corrupted(format!(
                        "leaf found above the bottom of the path at {}",
                        frame.addr
                    )))
                }
            };
        }

        // Path exhausted with work left over: the tree grows a level.
        let new_root = match carry {
            Carry::Entry(key, value) => Node::Leaf(LeafNode::single(key, value)),
            Carry::Split {
                left,
                separator,
                right,
            } => Node::Internal(InternalNode::new_root(left, separator, right)),
        };
        self.root = self.write_new_node(&new_root)?;
        debug!(
            root = self.root.offset(),
            leaf = new_root.is_leaf(),
            "new root"
        );
        Ok(true)
    }

    /// Split an overfull leaf of `order` keys.
    ///
    /// The left half (`order/2` keys) stays at `addr`; the right half,
    /// starting with the median, goes to a new block. Leaves keep every
    /// key, so the median is copied up rather than moved.
    fn split_leaf(&mut self, addr: BlockAddr, mut leaf: LeafNode) -> Result<Carry> {
        let mid = leaf.keys.len() / 2;
        let right = LeafNode {
            keys: leaf.keys.split_off(mid),
            values: leaf.values.split_off(mid),
        };
        let separator = right.keys[0];

        self.write_node(addr, &Node::Leaf(leaf))?;
        let right_addr = self.write_new_node(&Node::Leaf(right))?;
        IndexStats::bump(&self.stats.splits);
        debug!(left = addr.offset(), right = right_addr.offset(), separator, "split leaf");

        Ok(Carry::Split {
            left: addr,
            separator,
            right: right_addr,
        })
    }

    /// Split an overfull internal node of `order` keys and `order + 1`
    /// children.
    ///
    /// The median key leaves both halves; the child to its right becomes
    /// the new node's first child. The separator handed up is re-derived
    /// from the new node's leftmost leaf rather than taken from the median.
    fn split_internal(&mut self, addr: BlockAddr, mut internal: InternalNode) -> Result<Carry> {
        let mid = internal.keys.len() / 2;
        let right = InternalNode {
            keys: internal.keys.split_off(mid + 1),
            children: internal.children.split_off(mid + 1),
        };
        let median = internal.keys.pop();
        let separator = self.leftmost_key(right.children[0])?;

        self.write_node(addr, &Node::Internal(internal))?;
        let right_addr = self.write_new_node(&Node::Internal(right))?;
        IndexStats::bump(&self.stats.splits);
        debug!(
            left = addr.offset(),
            right = right_addr.offset(),
            ?median,
            separator,
            "split internal node"
        );

        Ok(Carry::Split {
            left: addr,
            separator,
            right: right_addr,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Node;
    use tempfile::tempdir;

    fn index_60() -> (BTreeIndex, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let index = BTreeIndex::create(dir.path().join("t.tree"), 60).unwrap();
        (index, dir)
    }

    #[test]
    fn test_first_insert_creates_leaf_root() {
        let (mut index, _dir) = index_60();
        assert!(index.insert(10, RecordAddr::new(1)).unwrap());

        assert_eq!(index.root(), BlockAddr::FIRST);
        let root = index.read_node(index.root()).unwrap();
        assert_eq!(root, Node::Leaf(LeafNode::single(10, RecordAddr::new(1))));
    }

    #[test]
    fn test_duplicate_rejected_without_write() {
        let (mut index, _dir) = index_60();
        index.insert(10, RecordAddr::new(1)).unwrap();
        let writes = index.stats_snapshot().blocks_written;

        assert!(!index.insert(10, RecordAddr::new(2)).unwrap());
        assert_eq!(index.stats_snapshot().blocks_written, writes);
        assert_eq!(index.search(10).unwrap(), Some(RecordAddr::new(1)));
    }

    #[test]
    fn test_null_record_rejected() {
        let (mut index, _dir) = index_60();
        assert!(matches!(
            index.insert(1, RecordAddr::new(0)),
            Err(Error::NullRecordAddr)
        ));
        assert!(index.is_empty());
    }

    #[test]
    fn test_leaf_split_sizes() {
        let (mut index, _dir) = index_60();
        for k in [10, 20, 30, 40, 25] {
            index.insert(k, RecordAddr::new(k as u64)).unwrap();
        }

        // order 5: left keeps 2, right takes 3 starting at the median
        let Node::Internal(root) = index.read_node(index.root()).unwrap() else {
            panic!("root should be internal after a split");
        };
        assert_eq!(root.keys, vec![25]);
        let left = index.read_node(root.children[0]).unwrap();
        let right = index.read_node(root.children[1]).unwrap();
        assert_eq!(left.keys(), &[10, 20]);
        assert_eq!(right.keys(), &[25, 30, 40]);
        assert_eq!(index.stats_snapshot().splits, 1);
    }

    #[test]
    fn test_internal_split_promotes_median() {
        let (mut index, _dir) = index_60();
        // Ascending inserts into order 5: leaves split at 5, 7, 9, 11, 13 keys;
        // the root overflows on the fifth leaf split.
        for k in 0..13 {
            index.insert(k, RecordAddr::new(k as u64 + 1)).unwrap();
        }

        let Node::Internal(root) = index.read_node(index.root()).unwrap() else {
            panic!("root should be internal");
        };
        assert_eq!(root.keys.len(), 1);
        assert_eq!(root.children.len(), 2);

        let Node::Internal(left) = index.read_node(root.children[0]).unwrap() else {
            panic!("expected internal child");
        };
        let Node::Internal(right) = index.read_node(root.children[1]).unwrap() else {
            panic!("expected internal child");
        };
        // Promoted key appears in neither half
        assert!(!left.keys.contains(&root.keys[0]));
        assert!(!right.keys.contains(&root.keys[0]));
        assert_eq!(left.keys.len(), 2);
        assert_eq!(right.keys.len(), 2);
        // And equals the smallest key reachable through the right half
        assert_eq!(index.leftmost_key(root.children[1]).unwrap(), root.keys[0]);
    }
}
