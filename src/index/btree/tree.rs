//! The index handle: lifecycle plus the block-level helpers every
//! operation builds on.

use std::path::Path;

use tracing::{debug, warn};

use crate::common::config::DEFAULT_BLOCK_SIZE;
use crate::common::{BlockAddr, Error, Result};
use crate::storage::{Block, BlockFile, BlockLayout, FreeList, Node, TreeHeader};

use super::path::Frame;
use super::stats::{IndexStats, StatsSnapshot};

/// A B-tree whose nodes are fixed-size blocks in a single file.
///
/// Nothing is cached between calls: every operation reads the nodes it
/// needs from disk, and writes back each node it changes before returning.
/// The only in-memory state is the header (root pointer, free-list head,
/// block size), which is written back by [`flush`](Self::flush) and
/// [`close`](Self::close).
///
/// # Usage
/// ```no_run
/// use blocktree::{BTreeIndex, RecordAddr};
///
/// let mut index = BTreeIndex::create("people.tree", 60)?;
/// assert!(index.insert(7, RecordAddr::new(4096))?);
/// assert_eq!(index.search(7)?, Some(RecordAddr::new(4096)));
/// index.close()?;
/// # Ok::<(), blocktree::Error>(())
/// ```
pub struct BTreeIndex {
    pub(super) file: BlockFile,
    pub(super) layout: BlockLayout,
    pub(super) root: BlockAddr,
    pub(super) free: FreeList,
    pub(super) stats: IndexStats,
    closed: bool,
}

impl BTreeIndex {
    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Create an empty index at `path`, truncating any existing file.
    ///
    /// # Errors
    /// - `Error::InvalidBlockSize` if `block_size` gives an order below 4
    /// - I/O errors from creating the file
    pub fn create<P: AsRef<Path>>(path: P, block_size: u32) -> Result<Self> {
        let layout = BlockLayout::new(block_size)?;
        let mut file = BlockFile::create(path.as_ref())?;
        file.write_header(&TreeHeader::new(block_size))?;

        debug!(
            path = %path.as_ref().display(),
            block_size,
            order = layout.order(),
            min_keys = layout.min_keys(),
            "created index"
        );

        Ok(Self::from_parts(file, layout, BlockAddr::NULL, BlockAddr::NULL))
    }

    /// Create an empty index with [`DEFAULT_BLOCK_SIZE`].
    pub fn create_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::create(path, DEFAULT_BLOCK_SIZE)
    }

    /// Open an existing index file.
    ///
    /// The header is checked against the file before anything is trusted:
    /// the block size must be legal and both pointers must land on blocks
    /// inside the file.
    ///
    /// # Errors
    /// - I/O errors if the file doesn't exist or cannot be opened
    /// - `Error::Corrupted` / `Error::InvalidBlockSize` for a bad header
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = BlockFile::open(path.as_ref())?;
        let header = file.read_header()?;
        header.validate(file.len())?;
        let layout = BlockLayout::new(header.block_size)?;

        debug!(
            path = %path.as_ref().display(),
            block_size = header.block_size,
            root = header.root.offset(),
            free = header.free.offset(),
            "opened index"
        );

        Ok(Self::from_parts(file, layout, header.root, header.free))
    }

    fn from_parts(file: BlockFile, layout: BlockLayout, root: BlockAddr, free: BlockAddr) -> Self {
        Self {
            file,
            layout,
            root,
            free: FreeList::new(free),
            stats: IndexStats::new(),
            closed: false,
        }
    }

    /// Write the header and sync the file, keeping the index open.
    pub fn flush(&mut self) -> Result<()> {
        self.file.write_header(&self.header())?;
        self.file.sync()
    }

    /// Write the header and release the file handle.
    pub fn close(mut self) -> Result<()> {
        self.flush()?;
        self.closed = true;
        debug!(root = self.root.offset(), free = self.free.head().offset(), "closed index");
        Ok(())
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Header as it would be written now.
    pub fn header(&self) -> TreeHeader {
        TreeHeader {
            root: self.root,
            free: self.free.head(),
            block_size: self.layout.block_size(),
        }
    }

    /// Size of every block in bytes.
    #[inline]
    pub fn block_size(&self) -> u32 {
        self.layout.block_size()
    }

    /// Maximum number of children per internal node.
    #[inline]
    pub fn order(&self) -> usize {
        self.layout.order()
    }

    /// Minimum number of keys in a non-root node.
    #[inline]
    pub fn min_keys(&self) -> usize {
        self.layout.min_keys()
    }

    /// Root block, `BlockAddr::NULL` for an empty tree.
    #[inline]
    pub fn root(&self) -> BlockAddr {
        self.root
    }

    /// Head of the free list, `BlockAddr::NULL` when empty.
    #[inline]
    pub fn free_head(&self) -> BlockAddr {
        self.free.head()
    }

    /// Whether the tree holds no keys.
    #[inline]
    pub fn is_empty(&self) -> bool {
        !self.root.is_valid()
    }

    /// Current size of the index file in bytes.
    #[inline]
    pub fn file_len(&self) -> u64 {
        self.file.len()
    }

    /// Live counters.
    #[inline]
    pub fn stats(&self) -> &IndexStats {
        &self.stats
    }

    /// Copy of the counters.
    pub fn stats_snapshot(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    // ========================================================================
    // Block helpers
    // ========================================================================

    /// Read and decode the live node at `addr`.
    ///
    /// # Errors
    /// `Error::UnexpectedFreeBlock` if the block is on the free list.
    pub(crate) fn read_node(&mut self, addr: BlockAddr) -> Result<Node> {
        let buf = self
            .file
            .read_block(addr, self.layout.block_size() as usize)?;
        IndexStats::bump(&self.stats.blocks_read);
        match Block::decode(&buf, &self.layout)? {
            Block::Node(node) => Ok(node),
            Block::Free { .. } => Err(Error::UnexpectedFreeBlock(addr)),
        }
    }

    pub(crate) fn read_frame(&mut self, addr: BlockAddr) -> Result<Frame> {
        Ok(Frame {
            addr,
            node: self.read_node(addr)?,
        })
    }

    /// Encode and write `node` at `addr`.
    pub(crate) fn write_node(&mut self, addr: BlockAddr, node: &Node) -> Result<()> {
        self.file.write_block(addr, &node.encode(&self.layout))?;
        IndexStats::bump(&self.stats.blocks_written);
        Ok(())
    }

    /// Allocate a block and write `node` into it.
    pub(crate) fn write_new_node(&mut self, node: &Node) -> Result<BlockAddr> {
        let reused = !self.free.is_empty();
        let addr = self.free.allocate(&mut self.file, &self.layout)?;
        IndexStats::bump(&self.stats.allocations);
        if reused {
            IndexStats::bump(&self.stats.reused_blocks);
        }
        self.write_node(addr, node)?;
        Ok(addr)
    }

    /// Put `addr` on the free list.
    pub(crate) fn release(&mut self, addr: BlockAddr) -> Result<()> {
        self.free.release(&mut self.file, &self.layout, addr)?;
        IndexStats::bump(&self.stats.releases);
        IndexStats::bump(&self.stats.blocks_written);
        Ok(())
    }

    /// First key of the leftmost leaf under `addr`.
    ///
    /// This is the smallest key in that subtree, and the separator a parent
    /// must hold to the left of it.
    pub(crate) fn leftmost_key(&mut self, mut addr: BlockAddr) -> Result<i32> {
        loop {
            match self.read_node(addr)? {
                Node::Internal(internal) => addr = internal.children[0],
                Node::Leaf(leaf) => {
                    return leaf.keys.first().copied().ok_or_else(|| {
                        Error::corrupted(format!("leaf {} under a separator is empty", addr))
                    })
                }
            }
        }
    }
}

impl Drop for BTreeIndex {
    fn drop(&mut self) {
        if !self.closed {
            if let Err(e) = self.flush() {
                warn!(error = %e, "failed to flush index header on drop");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::config::HEADER_SIZE;
    use tempfile::tempdir;

    #[test]
    fn test_create_writes_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.tree");

        let index = BTreeIndex::create(&path, 60).unwrap();
        assert!(index.is_empty());
        assert_eq!(index.order(), 5);
        assert_eq!(index.min_keys(), 1);
        assert_eq!(index.file_len(), HEADER_SIZE as u64);
        index.close().unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(bytes.len(), 20);
        assert_eq!(&bytes[16..20], &60i32.to_be_bytes());
    }

    #[test]
    fn test_create_rejects_small_block() {
        let dir = tempdir().unwrap();
        let result = BTreeIndex::create(dir.path().join("t.tree"), 36);
        assert!(matches!(result, Err(Error::InvalidBlockSize(36))));
    }

    #[test]
    fn test_create_default_block_size() {
        let dir = tempdir().unwrap();
        let index = BTreeIndex::create_default(dir.path().join("t.tree")).unwrap();
        assert_eq!(index.block_size(), DEFAULT_BLOCK_SIZE);
        assert_eq!(index.order(), 341);
    }

    #[test]
    fn test_open_missing_file() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            BTreeIndex::open(dir.path().join("missing.tree")),
            Err(Error::Io(_))
        ));
    }

    #[test]
    fn test_open_truncated_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.tree");
        std::fs::write(&path, [0u8; 10]).unwrap();

        assert!(matches!(BTreeIndex::open(&path), Err(Error::Corrupted(_))));
    }

    #[test]
    fn test_open_rejects_dangling_root() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.tree");
        let header = TreeHeader {
            root: BlockAddr::new(20),
            free: BlockAddr::NULL,
            block_size: 60,
        };
        std::fs::write(&path, header.to_bytes()).unwrap();

        assert!(matches!(BTreeIndex::open(&path), Err(Error::Corrupted(_))));
    }

    #[test]
    fn test_drop_flushes_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.tree");

        {
            let mut index = BTreeIndex::create(&path, 60).unwrap();
            index.insert(1, crate::RecordAddr::new(11)).unwrap();
            // dropped without close
        }

        let mut index = BTreeIndex::open(&path).unwrap();
        assert_eq!(index.root(), BlockAddr::FIRST);
        assert_eq!(index.search(1).unwrap(), Some(crate::RecordAddr::new(11)));
    }

    #[test]
    fn test_read_free_block_as_node_fails() {
        let dir = tempdir().unwrap();
        let mut index = BTreeIndex::create(dir.path().join("t.tree"), 60).unwrap();
        let addr = index
            .write_new_node(&Node::Leaf(crate::storage::LeafNode::single(
                1,
                crate::RecordAddr::new(1),
            )))
            .unwrap();
        index.release(addr).unwrap();

        assert!(matches!(
            index.read_node(addr),
            Err(Error::UnexpectedFreeBlock(a)) if a == addr
        ));
    }
}
