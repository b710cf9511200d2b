//! SQLite store for the book library.
//!
//! The store is a cache of what was found on disk during the last scan: the
//! files themselves are the source of truth and a reload rebuilds the store
//! from scratch. There is one table, `books`, with one row per document.

mod db;
pub mod error;
mod models;
mod repo;

pub use crate::db::Database;
pub use crate::models::{Entry, EntryId};
pub use crate::repo::Repository;
