//! Repository for book entries.
//!
//! Every method is a single statement in autocommit mode, so each mutation is
//! durable before it returns and never partially visible.

use crate::Database;
use crate::error::{ErrorKind, Result};
use crate::models::{Entry, EntryId, EntryRow};
use exn::{OptionExt, ResultExt};
use sqlx::SqlitePool;
use std::path::Path;
use tracing::instrument;

/// Repository for managing [`Entry`] rows in the store.
#[derive(Debug, Clone)]
pub struct Repository {
    pool: SqlitePool,
}
impl From<&Database> for Repository {
    fn from(db: &Database) -> Self {
        Self { pool: db.pool().clone() }
    }
}
impl Repository {
    fn sqlx_hates_paths(path: impl AsRef<Path>) -> Result<String> {
        Ok(path.as_ref().to_str().ok_or_raise(|| ErrorKind::InvalidData("path"))?.to_string())
    }

    /// Split an absolute file path into `(directory, filename)` as stored.
    fn split_path(path: &Path) -> Result<(String, String)> {
        let filename = path.file_name().ok_or_raise(|| ErrorKind::InvalidData("path has no file name"))?;
        let directory = path.parent().unwrap_or_else(|| Path::new(""));
        Ok((Self::sqlx_hates_paths(directory)?, Self::sqlx_hates_paths(filename)?))
    }

    /// Escape `LIKE` wildcards so that `term` only ever matches literally.
    fn like_pattern(term: &str) -> String {
        let mut pattern = String::with_capacity(term.len() + 2);
        pattern.push('%');
        for c in term.chars() {
            if matches!(c, '%' | '_' | '\\') {
                pattern.push('\\');
            }
            pattern.push(c);
        }
        pattern.push('%');
        pattern
    }

    // =========================================================================
    // Insert
    // =========================================================================

    /// Insert a new entry for the file at `path`.
    ///
    /// No uniqueness is enforced: adding the same path twice creates two
    /// entries with different ids.
    #[instrument(level = "trace", skip(self), fields(path = %path.display()))]
    pub async fn add(&self, path: &Path, title: &str, author: &str) -> Result<Entry> {
        let (directory, filename) = Self::split_path(path)?;
        let result = sqlx::query(include_str!("../queries/insert.sql"))
            .bind(title)
            .bind(author)
            .bind(&filename)
            .bind(&directory)
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(Entry {
            id: result.last_insert_rowid(),
            title: title.to_string(),
            author: author.to_string(),
            filename,
            directory: directory.into(),
        })
    }

    // =========================================================================
    // Get/Fetch
    // =========================================================================

    pub async fn get_by_id(&self, id: EntryId) -> Result<Entry> {
        let row: Option<EntryRow> = sqlx::query_as(include_str!("../queries/get_by_id.sql"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(row.ok_or_raise(|| ErrorKind::EntryNotFound(id))?.into())
    }

    /// Every entry whose title, author or filename contains `term`.
    ///
    /// Matching is case-insensitive for ASCII letters. An empty term matches
    /// every entry. Results are ordered by title, then by id.
    pub async fn search(&self, term: &str) -> Result<Vec<Entry>> {
        let pattern = Self::like_pattern(term);
        let rows: Vec<EntryRow> = sqlx::query_as(include_str!("../queries/search.sql"))
            .bind(&pattern)
            .bind(&pattern)
            .bind(&pattern)
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(rows.into_iter().map(Entry::from).collect())
    }

    /// Every entry, ordered by title, then by id.
    pub async fn list_all(&self) -> Result<Vec<Entry>> {
        let rows: Vec<EntryRow> = sqlx::query_as(include_str!("../queries/list_all.sql"))
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(rows.into_iter().map(Entry::from).collect())
    }

    pub async fn count(&self) -> Result<u64> {
        let row: (i64,) = sqlx::query_as(include_str!("../queries/count.sql"))
            .fetch_one(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        u64::try_from(row.0).or_raise(|| ErrorKind::InvalidData("count"))
    }

    // =========================================================================
    // Delete
    // =========================================================================

    /// Delete every entry stored for the file at `path`.
    ///
    /// Returns the number of entries removed; zero is not an error.
    #[instrument(level = "trace", skip(self), fields(path = %path.display()))]
    pub async fn remove(&self, path: &Path) -> Result<u64> {
        let (directory, filename) = Self::split_path(path)?;
        let result = sqlx::query(include_str!("../queries/delete_by_path.sql"))
            .bind(directory)
            .bind(filename)
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(result.rows_affected())
    }

    /// Delete every entry. Ids handed out before are still never reused.
    #[instrument(level = "debug", skip(self))]
    pub async fn clear(&self) -> Result<u64> {
        let result = sqlx::query(include_str!("../queries/clear.sql"))
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(result.rows_affected())
    }
}
