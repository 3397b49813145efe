//! Inclusive range scan.

use crate::common::{RecordAddr, Result};
use crate::storage::{InternalNode, Node};

use super::tree::BTreeIndex;

impl BTreeIndex {
    /// Payload addresses of every key in `low..=high`, in ascending key
    /// order.
    ///
    /// The whole result is collected before returning. Empty when the tree
    /// is empty, nothing matches, or `low > high`.
    pub fn range_search(&mut self, low: i32, high: i32) -> Result<Vec<RecordAddr>> {
        let mut out = Vec::new();
        if low > high || !self.root.is_valid() {
            return Ok(out);
        }

        // Depth-first, children pushed right-to-left so they pop in key order.
        let mut stack = vec![self.root];
        while let Some(addr) = stack.pop() {
            match self.read_node(addr)? {
                Node::Leaf(leaf) => {
                    let start = leaf.keys.partition_point(|&k| k < low);
                    for (key, value) in leaf.keys[start..].iter().zip(&leaf.values[start..]) {
                        if *key > high {
                            break;
                        }
                        out.push(*value);
                    }
                }
                Node::Internal(internal) => {
                    let slots = overlapping_children(&internal, low, high);
                    stack.extend(slots.into_iter().rev().map(|i| internal.children[i]));
                }
            }
        }

        Ok(out)
    }
}

/// Child slots whose key interval intersects `low..=high`.
///
/// Child `i` covers `keys[i-1]..keys[i]`, open-ended at either edge. For a
/// separator inside the range this visits the child to its left only when
/// the previous separator is below `low` (or it is the first one) and
/// always the child to its right, so no subtree is entered twice. A range
/// that falls strictly between two separators still reaches the one child
/// that covers it.
fn overlapping_children(node: &InternalNode, low: i32, high: i32) -> Vec<usize> {
    (0..node.children.len())
        .filter(|&i| {
            let above_low = i == node.keys.len() || node.keys[i] > low;
            let below_high = i == 0 || node.keys[i - 1] <= high;
            above_low && below_high
        })
        .collect()
}
