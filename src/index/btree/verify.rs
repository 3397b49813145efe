//! Structural checks and a readable dump of the tree.

use std::collections::{HashSet, VecDeque};
use std::fmt::{self, Write as _};

use crate::common::{BlockAddr, Error, Result};
use crate::storage::Node;

use super::tree::BTreeIndex;

/// Shape of a tree that passed [`BTreeIndex::verify`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TreeSummary {
    /// Levels from root to leaves; 0 for an empty tree.
    pub height: usize,
    pub internal_nodes: usize,
    pub leaf_nodes: usize,
    /// Keys stored in leaves.
    pub keys: usize,
    /// Blocks on the free list.
    pub free_blocks: usize,
}

impl fmt::Display for TreeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "height {}, {} internal, {} leaves, {} keys, {} free",
            self.height, self.internal_nodes, self.leaf_nodes, self.keys, self.free_blocks
        )
    }
}

/// One node waiting to be checked, with the key interval its parent allows.
struct Pending {
    addr: BlockAddr,
    depth: usize,
    low: Option<i32>,
    high: Option<i32>,
}

impl BTreeIndex {
    /// Walk the whole tree and check its invariants.
    ///
    /// - keys strictly ascending inside every node
    /// - every key within the interval its ancestors' separators allow
    /// - non-root nodes hold `min_keys..=order-1` keys, the root at least one
    /// - all leaves at the same depth
    /// - no block reachable twice, and none both live and on the free list
    ///
    /// # Errors
    /// `Error::Corrupted` describing the first violation found.
    pub fn verify(&mut self) -> Result<TreeSummary> {
        let free = self.free_list()?;
        let mut summary = TreeSummary {
            free_blocks: free.len(),
            ..Default::default()
        };
        let free: HashSet<BlockAddr> = free.into_iter().collect();
        let mut seen = HashSet::new();
        let mut leaf_depth = None;
        let (min, max) = (self.layout.min_keys(), self.layout.max_keys());

        let mut stack = Vec::new();
        if self.root.is_valid() {
            stack.push(Pending {
                addr: self.root,
                depth: 1,
                low: None,
                high: None,
            });
        }

        while let Some(Pending {
            addr,
            depth,
            low,
            high,
        }) = stack.pop()
        {
            if !seen.insert(addr) {
                return Err(Error::corrupted(format!("{} is reachable twice", addr)));
            }
            if free.contains(&addr) {
                return Err(Error::corrupted(format!("{} is live and free", addr)));
            }

            let node = self.read_node(addr)?;
            let keys = node.keys();
            let is_root = addr == self.root;

            if keys.is_empty() || keys.len() > max || (!is_root && keys.len() < min) {
                return Err(Error::corrupted(format!(
                    "{} holds {} keys, allowed {}..={}",
                    addr,
                    keys.len(),
                    if is_root { 1 } else { min },
                    max
                )));
            }
            if keys.windows(2).any(|w| w[0] >= w[1]) {
                return Err(Error::corrupted(format!("{} keys out of order: {:?}", addr, keys)));
            }
            let in_bounds = |k: i32| low.map_or(true, |lo| k >= lo) && high.map_or(true, |hi| k < hi);
            if let Some(&bad) = keys.iter().find(|&&k| !in_bounds(k)) {
                return Err(Error::corrupted(format!(
                    "{} key {} outside {:?}..{:?}",
                    addr, bad, low, high
                )));
            }

            summary.height = summary.height.max(depth);
            match node {
                Node::Leaf(leaf) => {
                    match leaf_depth {
                        None => leaf_depth = Some(depth),
                        Some(d) if d != depth => {
                            return Err(Error::corrupted(format!(
                                "leaf {} at depth {}, expected {}",
                                addr, depth, d
                            )))
                        }
                        Some(_) => {}
                    }
                    summary.leaf_nodes += 1;
                    summary.keys += leaf.keys.len();
                }
                Node::Internal(internal) => {
                    summary.internal_nodes += 1;
                    for (i, &child) in internal.children.iter().enumerate() {
                        if !child.is_valid() {
                            return Err(Error::corrupted(format!(
                                "{} has a null child in slot {}",
                                addr, i
                            )));
                        }
                        stack.push(Pending {
                            addr: child,
                            depth: depth + 1,
                            low: if i == 0 { low } else { Some(internal.keys[i - 1]) },
                            high: internal.keys.get(i).copied().or(high),
                        });
                    }
                }
            }
        }

        Ok(summary)
    }

    /// Blocks on the free list, head first.
    pub fn free_list(&mut self) -> Result<Vec<BlockAddr>> {
        self.free.walk(&mut self.file, &self.layout)
    }

    /// One line per node, breadth-first from the root.
    ///
    /// ```text
    /// Block(140) Count: 1 Keys: 2 Addrs: 20 80 internal
    /// Block(20) Count: -2 Keys: 0 1 Addrs: 1000 1001 leaf
    /// ```
    pub fn dump(&mut self) -> Result<String> {
        let mut out = String::new();
        let mut queue = VecDeque::new();
        if self.root.is_valid() {
            queue.push_back(self.root);
        }

        while let Some(addr) = queue.pop_front() {
            let node = self.read_node(addr)?;
            let keys: Vec<String> = node.keys().iter().map(i32::to_string).collect();
            let (addrs, kind): (Vec<String>, _) = match &node {
                Node::Leaf(leaf) => (
                    leaf.values.iter().map(|v| v.get().to_string()).collect(),
                    "leaf",
                ),
                Node::Internal(internal) => {
                    queue.extend(internal.children.iter().copied());
                    (
                        internal.children.iter().map(|c| c.offset().to_string()).collect(),
                        "internal",
                    )
                }
            };
            // Writing to a String cannot fail.
            let _ = writeln!(
                out,
                "{} Count: {} Keys: {} Addrs: {} {}",
                addr,
                node.count(),
                keys.join(" "),
                addrs.join(" "),
                kind
            );
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::RecordAddr;
    use crate::storage::{LeafNode, Node};
    use tempfile::tempdir;

    #[test]
    fn test_verify_empty_tree() {
        let dir = tempdir().unwrap();
        let mut index = BTreeIndex::create(dir.path().join("t.tree"), 60).unwrap();
        assert_eq!(index.verify().unwrap(), TreeSummary::default());
    }

    #[test]
    fn test_verify_counts() {
        let dir = tempdir().unwrap();
        let mut index = BTreeIndex::create(dir.path().join("t.tree"), 60).unwrap();
        for k in 0..5 {
            index.insert(k, RecordAddr::new(k as u64 + 1)).unwrap();
        }

        let summary = index.verify().unwrap();
        assert_eq!(summary.height, 2);
        assert_eq!(summary.internal_nodes, 1);
        assert_eq!(summary.leaf_nodes, 2);
        assert_eq!(summary.keys, 5);
        assert_eq!(summary.free_blocks, 0);
    }

    #[test]
    fn test_verify_catches_misplaced_key() {
        let dir = tempdir().unwrap();
        let mut index = BTreeIndex::create(dir.path().join("t.tree"), 60).unwrap();
        for k in 0..5 {
            index.insert(k, RecordAddr::new(k as u64 + 1)).unwrap();
        }

        // Overwrite the left leaf with a key that belongs on the right
        let crate::storage::Node::Internal(root) = index.read_node(index.root()).unwrap() else {
            panic!("expected internal root");
        };
        let bad = Node::Leaf(LeafNode::single(9, RecordAddr::new(9)));
        index.write_node(root.children[0], &bad).unwrap();

        assert!(matches!(index.verify(), Err(Error::Corrupted(_))));
    }

    #[test]
    fn test_dump_format() {
        let dir = tempdir().unwrap();
        let mut index = BTreeIndex::create(dir.path().join("t.tree"), 60).unwrap();
        for k in 0..5 {
            index.insert(k, RecordAddr::new(k as u64 + 100)).unwrap();
        }

        let dump = index.dump().unwrap();
        let lines: Vec<&str> = dump.lines().collect();
        assert_eq!(lines.len(), 3);
        // Left half stays in the block it started in, right half and new root are appended
        assert_eq!(lines[0], "Block(140) Count: 1 Keys: 2 Addrs: 20 80 internal");
        assert_eq!(lines[1], "Block(20) Count: -2 Keys: 0 1 Addrs: 100 101 leaf");
        assert_eq!(lines[2], "Block(80) Count: -3 Keys: 2 3 4 Addrs: 102 103 104 leaf");
    }
}
