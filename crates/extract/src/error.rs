//! Extraction Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.
//!
//! None of these ever escape [`extract()`](crate::extract): they are logged
//! and replaced by the filename fallback. They are public so that callers
//! wanting to know *why* a document had no usable metadata can call the
//! format readers directly.

use derive_more::{Display, Error};

/// An extraction error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for extraction operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The file could not be opened or read.
    #[display("I/O error")]
    Io,
    /// The file is not a structurally valid document of the expected format.
    #[display("malformed {_0} document")]
    Malformed(#[error(not(source))] &'static str),
    /// A required structure inside the document was not found.
    #[display("missing required structure: {_0}")]
    MissingStructure(#[error(not(source))] &'static str),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // The document is either readable or it isn't; only I/O is transient.
        matches!(self, Self::Io)
    }
}
