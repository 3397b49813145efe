//! Error types for the block tree index.

use thiserror::Error;

use super::BlockAddr;

/// Convenient Result type alias.
///
/// Instead of writing `Result<T, Error>` everywhere, we can write `Result<T>`.
pub type Result<T> = std::result::Result<T, Error>;

/// All errors the index can raise.
///
/// Key-presence outcomes are not errors: a duplicate insert returns
/// `Ok(false)` and a missing key returns `Ok(None)`. Everything here is a
/// fault the caller must handle, because continuing after a failed write
/// leaves the tree inconsistent.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error from the backing file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Block size cannot hold a valid node, or is absurdly large.
    #[error("Invalid block size: {0}")]
    InvalidBlockSize(u32),

    /// Record address 0 is reserved for "not found" and cannot be stored.
    #[error("Record address 0 cannot be stored in the index")]
    NullRecordAddr,

    /// A block held a free-list record where a live node was expected.
    #[error("{0} is on the free list but was reached as a live node")]
    UnexpectedFreeBlock(BlockAddr),

    /// Header or node bytes that cannot be trusted.
    #[error("Corrupted index: {0}")]
    Corrupted(String),
}

impl Error {
    /// Build a [`Error::Corrupted`] from anything displayable.
    pub(crate) fn corrupted(msg: impl Into<String>) -> Self {
        Error::Corrupted(msg.into())
    }
}
