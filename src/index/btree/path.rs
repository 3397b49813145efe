//! Root-to-leaf traversal.
//!
//! There are no parent pointers on disk, so every operation starts by
//! walking down from the root and recording each node it passes through.
//! Insert and delete then pop that record bottom-up to propagate splits
//! and merges.

use crate::common::{BlockAddr, RecordAddr, Result};
use crate::storage::Node;

use super::tree::BTreeIndex;

/// A decoded node together with the block it was read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub addr: BlockAddr,
    pub node: Node,
}

/// Nodes visited by one descent, root first.
///
/// Transient: built per call, consumed by the same call.
#[derive(Debug, Default)]
pub struct Path {
    frames: Vec<Frame>,
}

impl Path {
    pub fn push(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    /// Take the deepest remaining frame.
    pub fn pop(&mut self) -> Option<Frame> {
        self.frames.pop()
    }
}

impl BTreeIndex {
    /// Look up the payload address stored for `key`.
    ///
    /// Returns `Ok(None)` if the key is absent.
    pub fn search(&mut self, key: i32) -> Result<Option<RecordAddr>> {
        Ok(self.find_path(key)?.1)
    }

    /// Whether `key` is present.
    pub fn contains(&mut self, key: i32) -> Result<bool> {
        Ok(self.search(key)?.is_some())
    }

    /// Descend from the root towards `key`, recording every node.
    ///
    /// At an internal node the first key greater than `key` picks the child
    /// to its left; if there is none, the last child. The returned path ends
    /// at the leaf where `key` is or would be, and is empty for an empty
    /// tree.
    pub(crate) fn find_path(&mut self, key: i32) -> Result<(Path, Option<RecordAddr>)> {
        let mut path = Path::default();
        let mut addr = self.root;

        while addr.is_valid() {
            let node = self.read_node(addr)?;
            let next = match &node {
                Node::Internal(internal) => internal.children[internal.route(key)],
                Node::Leaf(leaf) => {
                    let found = leaf.get(key);
                    path.push(Frame { addr, node });
                    return Ok((path, found));
                }
            };
            path.push(Frame { addr, node });
            addr = next;
        }

        Ok((path, None))
    }
}
