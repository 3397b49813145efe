//! Record address type.

use std::fmt;

/// Opaque payload address the index associates with each key.
///
/// Only the record store knows what it means. The index stores it verbatim
/// in leaf slots; the single exception is 0, which the file format cannot
/// tell apart from "absent" and is therefore rejected on insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordAddr(pub u64);

impl RecordAddr {
    /// Create a new RecordAddr.
    #[inline]
    pub fn new(addr: u64) -> Self {
        RecordAddr(addr)
    }

    /// Raw value.
    #[inline]
    pub fn get(&self) -> u64 {
        self.0
    }

    /// Whether this address can be stored (is non-zero).
    #[inline]
    pub fn is_storable(&self) -> bool {
        self.0 != 0
    }
}

impl From<u64> for RecordAddr {
    fn from(addr: u64) -> Self {
        RecordAddr(addr)
    }
}

impl fmt::Display for RecordAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Record({})", self.0)
    }
}
