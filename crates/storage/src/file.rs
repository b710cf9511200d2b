use std::path::{Path, PathBuf};

/// A regular file discovered while walking the library root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    /// Path relative to the library root
    pub path: PathBuf,
}
impl FileInfo {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Absolute location of this file under `root`.
    pub fn absolute(&self, root: &Path) -> PathBuf {
        root.join(&self.path)
    }
}
