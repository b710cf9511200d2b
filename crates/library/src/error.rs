//! Library Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A library error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Classifies the origin of a library failure.
///
/// ### Operational Errors
/// - [`ErrorKind::NoSuchPosition`]
/// - [`ErrorKind::UnsupportedFileType`]
/// - [`ErrorKind::NotConfigured`]
/// - [`ErrorKind::Launch`] - never fatal, see [`Launch`](crate::Launch)
///
/// ### Dependency Errors
/// - [`ErrorKind::Scan`]
/// - [`ErrorKind::Cache`]
/// - [`ErrorKind::Config`]
/// - [`ErrorKind::Storage`]
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// A scan could not add a file, or could not walk part of the tree.
    #[display("library scan error")]
    Scan,
    /// A lookup or update via [`libris_cache::Repository`] failed.
    #[display("book store error")]
    Cache,
    #[display("configuration error")]
    Config,
    /// The library root could not be used.
    #[display("library directory error")]
    Storage,
    /// The row position is not part of the most recent result list.
    #[display("no entry at position {_0}")]
    NoSuchPosition(#[error(not(source))] usize),
    /// No opener command is configured for this file type.
    #[display("no command configured to open `{_0}` files")]
    UnsupportedFileType(#[error(not(source))] String),
    /// A setting required for this operation has no value.
    #[display("`{_0}` is not configured")]
    NotConfigured(#[error(not(source))] &'static str),
    #[display("could not launch: {_0}")]
    Launch(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
