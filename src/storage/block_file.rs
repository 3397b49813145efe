//! Block file - low-level I/O for the index file.
//!
//! The [`BlockFile`] handles all direct file operations:
//! - Reading and writing the header
//! - Reading and writing whole blocks at byte offsets
//! - Tracking the file length the allocator extends

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::common::config::HEADER_SIZE;
use crate::common::{BlockAddr, Error, Result};

use super::header::TreeHeader;

/// Owns the handle of a single index file.
///
/// # File Layout
/// ```text
/// ┌────────┬─────────┬─────────┬─────────┬─────────┐
/// │ Header │ Block 0 │ Block 1 │  ...    │ Block N │
/// │ (20B)  │ (bs)    │ (bs)    │         │ (bs)    │
/// └────────┴─────────┴─────────┴─────────┴─────────┘
/// Offset:  0   20      20+bs    ...    20+N×bs
/// ```
///
/// Blocks are addressed by their byte offset ([`BlockAddr`]), not by index.
///
/// # Thread Safety
/// `BlockFile` is **single-threaded**. The index owning it serializes access.
///
/// # Durability
/// Writes go straight to the file without `fsync()`; [`BlockFile::sync`] is
/// called when the header is flushed. There is no crash consistency between
/// syncs.
pub struct BlockFile {
    file: File,
    /// Current length of the file in bytes.
    len: u64,
}

impl BlockFile {
    /// Create a new index file, truncating any existing file at `path`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;

        Ok(Self { file, len: 0 })
    }

    /// Open an existing index file.
    ///
    /// # Errors
    /// Returns an error if the file doesn't exist or cannot be opened.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(&path)?;
        let len = file.metadata()?.len();

        Ok(Self { file, len })
    }

    /// Read the header at offset 0.
    ///
    /// # Errors
    /// `Error::Corrupted` if the file is shorter than the header.
    pub fn read_header(&mut self) -> Result<TreeHeader> {
        if self.len < HEADER_SIZE as u64 {
            return Err(Error::corrupted(format!(
                "file of {} bytes has no header",
                self.len
            )));
        }

        let mut buf = [0u8; HEADER_SIZE];
        self.file.seek(SeekFrom::Start(0))?;
        self.file.read_exact(&mut buf)?;
        TreeHeader::from_bytes(&buf)
    }

    /// Write the header at offset 0.
    pub fn write_header(&mut self, header: &TreeHeader) -> Result<()> {
        self.file.seek(SeekFrom::Start(0))?;
        self.file.write_all(&header.to_bytes())?;
        self.len = self.len.max(HEADER_SIZE as u64);
        Ok(())
    }

    /// Read `size` bytes of the block at `addr`.
    ///
    /// # Errors
    /// `Error::Corrupted` if the block lies outside the file.
    pub fn read_block(&mut self, addr: BlockAddr, size: usize) -> Result<Vec<u8>> {
        if addr.offset() < HEADER_SIZE as u64 || addr.offset() + size as u64 > self.len {
            return Err(Error::corrupted(format!(
                "{} is outside the {}-byte file",
                addr, self.len
            )));
        }

        self.file.seek(SeekFrom::Start(addr.offset()))?;
        let mut buf = vec![0u8; size];
        self.file.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Write a whole block at `addr`.
    ///
    /// `addr` may be the current end of file, in which case the file grows
    /// by exactly one block.
    ///
    /// # Errors
    /// `Error::Corrupted` if `addr` is inside the header or past the end.
    pub fn write_block(&mut self, addr: BlockAddr, data: &[u8]) -> Result<()> {
        if addr.offset() < HEADER_SIZE as u64 || addr.offset() > self.len {
            return Err(Error::corrupted(format!(
                "cannot write {} in a {}-byte file",
                addr, self.len
            )));
        }

        self.file.seek(SeekFrom::Start(addr.offset()))?;
        self.file.write_all(data)?;
        self.len = self.len.max(addr.offset() + data.len() as u64);
        Ok(())
    }

    /// Flush file contents to disk.
    pub fn sync(&mut self) -> Result<()> {
        self.file.sync_all()?;
        Ok(())
    }

    /// Get the total size of the file in bytes.
    #[inline]
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Whether nothing (not even a header) has been written yet.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}
