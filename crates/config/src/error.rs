//! Configuration Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A configuration error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for configuration operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The configuration file could not be read or written.
    #[display("configuration file I/O error")]
    Io,
    /// The merged configuration sources could not be interpreted.
    #[display("invalid configuration")]
    Invalid,
    #[display("unknown setting: {_0}")]
    UnknownSetting(#[error(not(source))] String),
    /// Strict load or save with recognized keys missing.
    #[display("configuration is incomplete, missing: {}", _0.join(", "))]
    Incomplete(#[error(not(source))] Vec<&'static str>),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io)
    }
}
