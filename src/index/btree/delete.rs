//! Delete with borrow/merge rebalancing.
//!
//! After the key leaves its leaf, the path is unwound bottom-up. A node
//! that fell below `min_keys` first tries to borrow one entry from a
//! sibling holding more than `min_keys`; failing that it is merged with a
//! sibling and the parent loses a separator, which can underflow the parent
//! in turn. Every ancestor on the path is then checked for a separator equal
//! to the deleted key and rewritten.

use tracing::debug;

use crate::common::{BlockAddr, Error, RecordAddr, Result};
use crate::storage::{InternalNode, Node};

use super::path::Frame;
use super::stats::IndexStats;
use super::tree::BTreeIndex;

impl BTreeIndex {
    /// Remove `key` and return the payload address it mapped to.
    ///
    /// Returns `Ok(None)` without writing anything if `key` is absent. The
    /// caller owns the payload storage and is responsible for freeing it.
    pub fn remove(&mut self, key: i32) -> Result<Option<RecordAddr>> {
        let (mut path, found) = self.find_path(key)?;
        let Some(removed) = found else {
            return Ok(None);
        };

        let Some(mut current) = path.pop() else {
            return Err(Error::corrupted("key found without a leaf on the path"));
        };
        match &mut current.node {
            Node::Leaf(leaf) => {
                leaf.remove(key);
            }
            Node::Internal(_) => {
                return Err(Error::corrupted(format!(
                    "search for {} ended at internal node {}",
                    key, current.addr
                )))
            }
        }

        let mut underflow = self.underflows(&current);
        while underflow {
            let Some(mut parent) = path.pop() else {
                break;
            };
            let Node::Internal(internal) = &mut parent.node else {
                return Err(Error::corrupted(format!(
                    "leaf {} found above the bottom of the path",
                    parent.addr
                )));
            };

            let borrowed = self.rebalance(internal, current)?;
            underflow = !borrowed && self.underflows(&parent);
            if let Node::Internal(internal) = &mut parent.node {
                self.repair_separator(internal, key)?;
            }
            current = parent;
        }

        if underflow {
            // Only the root is left, and it has no keys.
            self.collapse_root(current)?;
        } else {
            self.write_frame(current, key)?;
        }

        while let Some(frame) = path.pop() {
            self.write_frame(frame, key)?;
        }

        Ok(Some(removed))
    }

    /// Whether `frame` is below its occupancy floor.
    ///
    /// The root only underflows once it is empty; every other node must keep
    /// at least `min_keys`.
    fn underflows(&self, frame: &Frame) -> bool {
        if frame.addr == self.root {
            frame.node.is_empty()
        } else {
            frame.node.len() < self.layout.min_keys()
        }
    }

    /// Fix the underflowing `child` of `parent`.
    ///
    /// Borrows from the left sibling, else the right, if either can spare
    /// an entry; otherwise merges, preferring the left sibling. Writes every
    /// node it changes except `parent`. Returns `true` if it borrowed, in
    /// which case `parent` keeps its key count.
    fn rebalance(&mut self, parent: &mut InternalNode, child: Frame) -> Result<bool> {
        let min = self.layout.min_keys();
        let slot = parent.child_slot(child.addr).ok_or_else(|| {
            Error::corrupted(format!("{} is missing from its parent", child.addr))
        })?;

        let left = match slot {
            0 => None,
            s => Some(self.read_frame(parent.children[s - 1])?),
        };
        let left = match left {
            Some(left) if left.node.len() > min => {
                self.borrow_from_left(parent, slot, left, child)?;
                return Ok(true);
            }
            other => other,
        };

        let right = if slot + 1 < parent.children.len() {
            Some(self.read_frame(parent.children[slot + 1])?)
        } else {
            None
        };
        match (left, right) {
            (_, Some(right)) if right.node.len() > min => {
                self.borrow_from_right(parent, slot, child, right)?;
                Ok(true)
            }
            (Some(left), _) => {
                self.merge(parent, slot - 1, left, child)?;
                Ok(false)
            }
            (None, Some(right)) => {
                self.merge(parent, slot, child, right)?;
                Ok(false)
            }
            (None, None) => Err(Error::corrupted(format!(
                "{} has no siblings to rebalance with",
                child.addr
            ))),
        }
    }

    /// Move the last entry of `left` to the front of `child`.
    fn borrow_from_left(
        &mut self,
        parent: &mut InternalNode,
        slot: usize,
        mut left: Frame,
        mut child: Frame,
    ) -> Result<()> {
        match (&mut left.node, &mut child.node) {
            (Node::Leaf(from), Node::Leaf(to)) => {
                let (Some(key), Some(value)) = (from.keys.pop(), from.values.pop()) else {
                    return Err(Error::corrupted("borrowing from an empty leaf"));
                };
                to.keys.insert(0, key);
                to.values.insert(0, value);
                parent.keys[slot - 1] = key;
            }
            (Node::Internal(from), Node::Internal(to)) => {
                from.keys.pop();
                let Some(moved) = from.children.pop() else {
                    return Err(Error::corrupted("borrowing from a childless node"));
                };
                let old_first = to.children[0];
                to.children.insert(0, moved);
                to.keys.insert(0, self.leftmost_key(old_first)?);
                parent.keys[slot - 1] = self.leftmost_key(moved)?;
            }
            _ => return Err(mixed_siblings(left.addr, child.addr)),
        }

        self.write_node(left.addr, &left.node)?;
        self.write_node(child.addr, &child.node)?;
        IndexStats::bump(&self.stats.borrows);
        debug!(from = left.addr.offset(), to = child.addr.offset(), "borrow from left");
        Ok(())
    }

    /// Move the first entry of `right` to the end of `child`.
    fn borrow_from_right(
        &mut self,
        parent: &mut InternalNode,
        slot: usize,
        mut child: Frame,
        mut right: Frame,
    ) -> Result<()> {
        match (&mut child.node, &mut right.node) {
            (Node::Leaf(to), Node::Leaf(from)) => {
                to.keys.push(from.keys.remove(0));
                to.values.push(from.values.remove(0));
                parent.keys[slot] = from.keys[0];
            }
            (Node::Internal(to), Node::Internal(from)) => {
                from.keys.remove(0);
                let moved = from.children.remove(0);
                to.keys.push(self.leftmost_key(moved)?);
                to.children.push(moved);
                parent.keys[slot] = self.leftmost_key(from.children[0])?;
            }
            _ => return Err(mixed_siblings(child.addr, right.addr)),
        }

        self.write_node(right.addr, &right.node)?;
        self.write_node(child.addr, &child.node)?;
        IndexStats::bump(&self.stats.borrows);
        debug!(from = right.addr.offset(), to = child.addr.offset(), "borrow from right");
        Ok(())
    }

    /// Fold `right` into `left`, where `parent.keys[sep]` separates them.
    ///
    /// The right block is released; the parent loses the separator and the
    /// pointer to the right block. Internal merges pull down a separator
    /// re-derived from the right node's leftmost leaf.
    fn merge(
        &mut self,
        parent: &mut InternalNode,
        sep: usize,
        mut left: Frame,
        right: Frame,
    ) -> Result<()> {
        match (&mut left.node, right.node) {
            (Node::Leaf(into), Node::Leaf(from)) => {
                into.keys.extend(from.keys);
                into.values.extend(from.values);
            }
            (Node::Internal(into), Node::Internal(from)) => {
                into.keys.push(self.leftmost_key(from.children[0])?);
                into.keys.extend(from.keys);
                into.children.extend(from.children);
            }
            _ => return Err(mixed_siblings(left.addr, right.addr)),
        }

        parent.keys.remove(sep);
        parent.children.remove(sep + 1);
        self.write_node(left.addr, &left.node)?;
        self.release(right.addr)?;
        IndexStats::bump(&self.stats.merges);
        debug!(into = left.addr.offset(), freed = right.addr.offset(), "merge");
        Ok(())
    }

    /// Replace a separator equal to the deleted `key` with the smallest key
    /// now under its right child.
    fn repair_separator(&mut self, node: &mut InternalNode, key: i32) -> Result<()> {
        if let Some(i) = node.keys.iter().position(|&k| k == key) {
            node.keys[i] = self.leftmost_key(node.children[i + 1])?;
        }
        Ok(())
    }

    /// Repair and write back an ancestor that did not need rebalancing.
    fn write_frame(&mut self, mut frame: Frame, key: i32) -> Result<()> {
        if let Node::Internal(internal) = &mut frame.node {
            self.repair_separator(internal, key)?;
        }
        self.write_node(frame.addr, &frame.node)
    }

    /// Drop an empty root: its only child becomes the root, or the tree
    /// becomes empty if it was a leaf.
    fn collapse_root(&mut self, root: Frame) -> Result<()> {
        let new_root = match &root.node {
            Node::Internal(internal) => internal.children[0],
            Node::Leaf(_) => BlockAddr::NULL,
        };
        self.release(root.addr)?;
        self.root = new_root;
        debug!(
            old = root.addr.offset(),
            new = new_root.offset(),
            "collapsed root"
        );
        Ok(())
    }
}

fn mixed_siblings(a: BlockAddr, b: BlockAddr) -> Error {
    Error::corrupted(format!("siblings {} and {} are not the same kind", a, b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn filled(keys: impl IntoIterator<Item = i32>) -> (BTreeIndex, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let mut index = BTreeIndex::create(dir.path().join("t.tree"), 60).unwrap();
        for k in keys {
            index.insert(k, RecordAddr::new(k as u64 + 1000)).unwrap();
        }
        (index, dir)
    }

    #[test]
    fn test_remove_absent_writes_nothing() {
        let (mut index, _dir) = filled(0..10);
        let writes = index.stats_snapshot().blocks_written;

        assert_eq!(index.remove(42).unwrap(), None);
        assert_eq!(index.stats_snapshot().blocks_written, writes);
    }

    #[test]
    fn test_remove_last_key_empties_tree() {
        let (mut index, _dir) = filled([7]);
        let root = index.root();

        assert_eq!(index.remove(7).unwrap(), Some(RecordAddr::new(1007)));
        assert!(index.is_empty());
        assert_eq!(index.free_head(), root);
        assert_eq!(index.search(7).unwrap(), None);
    }

    #[test]
    fn test_borrow_from_right_leaf() {
        // Leaves [0,1] [2,3,4] under root [2]
        let (mut index, _dir) = filled(0..5);
        index.remove(0).unwrap();
        index.remove(1).unwrap();

        let Node::Internal(root) = index.read_node(index.root()).unwrap() else {
            panic!("root should still be internal");
        };
        assert_eq!(root.keys, vec![3]);
        assert_eq!(index.read_node(root.children[0]).unwrap().keys(), &[2]);
        assert_eq!(index.read_node(root.children[1]).unwrap().keys(), &[3, 4]);
        assert_eq!(index.stats_snapshot().borrows, 1);
    }

    #[test]
    fn test_borrow_from_left_leaf() {
        // Leaves [0,1] [2,3,4]; drain the right leaf down to one key first
        let (mut index, _dir) = filled([0, 1, 2, 3, 4, -1]);
        // Leaves now [-1,0,1] [2,3,4]
        index.remove(3).unwrap();
        index.remove(4).unwrap();
        index.remove(2).unwrap();

        let Node::Internal(root) = index.read_node(index.root()).unwrap() else {
            panic!("root should still be internal");
        };
        assert_eq!(root.keys, vec![1]);
        assert_eq!(index.read_node(root.children[0]).unwrap().keys(), &[-1, 0]);
        assert_eq!(index.read_node(root.children[1]).unwrap().keys(), &[1]);
    }

    #[test]
    fn test_merge_collapses_root() {
        let (mut index, _dir) = filled(0..5);
        let old_root = index.root();
        // [0,1] [2,3,4] -> [1] [4]; neither sibling can lend when 4 goes
        index.remove(0).unwrap();
        index.remove(2).unwrap();
        index.remove(3).unwrap();
        index.remove(4).unwrap();

        assert_eq!(index.stats_snapshot().merges, 1);
        assert_eq!(index.stats_snapshot().borrows, 0);
        let root = index.read_node(index.root()).unwrap();
        assert!(root.is_leaf());
        assert_eq!(root.keys(), &[1]);
        // Both the merged-away leaf and the old root are on the free list
        assert_eq!(index.free_list().unwrap().len(), 2);
        assert_eq!(index.free_head(), old_root);
    }

    #[test]
    fn test_separator_repaired_after_delete() {
        let (mut index, _dir) = filled(0..5);
        // Root separator is 2, the first key of the right leaf
        index.remove(2).unwrap();

        let Node::Internal(root) = index.read_node(index.root()).unwrap() else {
            panic!("root should still be internal");
        };
        assert_eq!(root.keys, vec![3]);
    }
}
