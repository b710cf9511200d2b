use std::path::Path;

/// Best-effort descriptive metadata for a document.
///
/// `title` is never empty for values produced by [`extract()`](crate::extract);
/// `author` is an empty string when unknown.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Metadata {
    pub title: String,
    pub author: String,
}
impl Metadata {
    pub fn new(title: impl Into<String>, author: impl Into<String>) -> Self {
        Self { title: title.into(), author: author.into() }
    }

    /// Derive metadata from the file name alone.
    ///
    /// The extension is stripped, remaining dots become spaces and the result
    /// is trimmed: `My.Book.Title.pdf` becomes `My Book Title`. If nothing is
    /// left after cleaning, the raw file name is used so the title is never
    /// empty. The author is always empty.
    pub fn from_filename(path: impl AsRef<Path>) -> Self {
        let filename = path.as_ref().file_name().map(|name| name.to_string_lossy()).unwrap_or_default();
        let stem = filename.rsplit_once('.').map(|(stem, _)| stem).unwrap_or(&*filename);
        let title = stem.replace('.', " ").trim().to_string();
        let title = if title.is_empty() { filename.trim().to_string() } else { title };
        Self { title, author: String::new() }
    }
}
