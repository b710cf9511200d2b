use std::path::PathBuf;

/// Store-assigned identifier of an [`Entry`]. Never reused, even after a clear.
pub type EntryId = i64;

/// One book in the library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub id: EntryId,
    pub title: String,
    /// Empty when unknown, never null.
    pub author: String,
    /// Base name only.
    pub filename: String,
    /// Absolute path of the containing directory.
    pub directory: PathBuf,
}
impl Entry {
    /// Lowercase extension of the file name; selects the opener command.
    pub fn file_type(&self) -> String {
        libris_extract::file_type(&self.filename)
    }

    pub fn full_path(&self) -> PathBuf {
        self.directory.join(&self.filename)
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct EntryRow {
    id: i64,
    title: String,
    author: String,
    filename: String,
    path: String,
}
impl From<EntryRow> for Entry {
    fn from(row: EntryRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            author: row.author,
            filename: row.filename,
            directory: PathBuf::from(row.path),
        }
    }
}
