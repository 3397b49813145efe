//! Common types and utilities shared across the crate.
//!
//! This module contains fundamental primitives used throughout the codebase:
//! - Configuration constants
//! - Error types
//! - Addresses (BlockAddr, RecordAddr)

mod block_addr;
pub mod config;
pub mod error;
mod record_addr;

pub use block_addr::BlockAddr;
pub use error::{Error, Result};
pub use record_addr::RecordAddr;
