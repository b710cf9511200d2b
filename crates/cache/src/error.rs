//! Cache Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use crate::models::EntryId;
use derive_more::{Display, Error};

/// A cache error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for cache operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The store could not be opened, read or written.
    #[display("database error")]
    Database,
    #[display("database migration error")]
    Migration,
    #[display("entry not found: {_0}")]
    EntryNotFound(#[error(not(source))] EntryId),
    /// A value cannot be represented in the store (non UTF-8 paths, mostly).
    #[display("invalid cache data: {_0}")]
    InvalidData(#[error(not(source))] &'static str),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // Single connection, single writer: a failure won't fix itself.
        false
    }
}
