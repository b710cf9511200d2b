//! Local filesystem traversal.
//!
//! The library root is only ever read: nothing in this module creates,
//! writes or removes files. Listing is a depth-first walk using `tokio::fs`,
//! with directory entries visited in byte order of their names so that the
//! same tree always produces the same sequence.

use crate::error::{ErrorKind, Result};
use crate::file::FileInfo;
use async_stream::stream;
use exn::ResultExt;
use futures::Stream;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use tokio::fs::{self, DirEntry};

pub type FileInfoStream<'a> = Pin<Box<dyn Stream<Item = Result<FileInfo>> + Send + 'a>>;

enum WalkEntry {
    File(FileInfo),
    Descend(PathBuf),
    Skip,
}

/// Read-only view of a directory tree on the local filesystem.
///
/// # Examples
///
/// ```no_run
/// use libris_storage::LocalBackend;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = LocalBackend::new("/home/me/Books")?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct LocalBackend {
    root: PathBuf,
}
impl LocalBackend {
    /// Create a backend rooted at `root`.
    ///
    /// Relative roots are resolved against the current directory. A root that
    /// does not exist yet is accepted (and lists as empty); a root that exists
    /// but is not a directory is rejected.
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = std::path::absolute(root.as_ref()).map_err(ErrorKind::Io)?;
        if root.exists() && !root.is_dir() {
            exn::bail!(ErrorKind::InvalidRoot(root));
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute location of a listed file.
    pub fn absolute_path(&self, file: &FileInfo) -> PathBuf {
        file.absolute(&self.root)
    }

    fn map_io_error(e: std::io::Error, path: &Path) -> ErrorKind {
        match e.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::NotFound(path.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied(path.to_path_buf()),
            _ => ErrorKind::Io(e),
        }
    }

    async fn read_sorted(dir: &Path) -> std::io::Result<Vec<DirEntry>> {
        let mut reader = fs::read_dir(dir).await?;
        let mut entries = Vec::new();
        while let Some(entry) = reader.next_entry().await? {
            entries.push(entry);
        }
        entries.sort_by_key(DirEntry::file_name);
        Ok(entries)
    }

    /// Classify one directory entry. Symlinks to files are followed; symlinks
    /// to directories are not, so a link cycle can never trap the walk.
    async fn process_entry(&self, entry: &DirEntry) -> Result<WalkEntry> {
        let path = entry.path();
        let file_type = entry.file_type().await.map_err(|e| Self::map_io_error(e, &path))?;
        if file_type.is_dir() {
            return Ok(WalkEntry::Descend(path));
        }
        if file_type.is_symlink() {
            match fs::metadata(&path).await {
                Ok(target) if target.is_file() => {},
                Ok(_) => return Ok(WalkEntry::Skip),
                Err(err) => {
                    tracing::trace!(path = %path.display(), error = %err, "Skipping broken symlink");
                    return Ok(WalkEntry::Skip);
                },
            }
        } else if !file_type.is_file() {
            return Ok(WalkEntry::Skip);
        }
        let relative = path.strip_prefix(&self.root).or_raise(|| ErrorKind::InvalidRoot(self.root.clone()))?;
        Ok(WalkEntry::File(FileInfo::new(relative)))
    }

    /// Stream every regular file below the root, depth-first.
    ///
    /// Within a directory, files are yielded in name order before any
    /// subdirectory is entered; subdirectories are then walked in name order.
    /// Unreadable directories and entries are yielded as errors and the walk
    /// carries on. A root that does not exist yields nothing.
    pub fn list_stream(&self) -> FileInfoStream<'_> {
        Box::pin(stream! {
            let mut stack = vec![self.root.clone()];
            while let Some(current) = stack.pop() {
                let entries = match Self::read_sorted(&current).await {
                    Ok(entries) => entries,
                    Err(err) if err.kind() == std::io::ErrorKind::NotFound => continue,
                    Err(err) => {
                        yield Err(exn::Exn::from(Self::map_io_error(err, &current)));
                        continue;
                    },
                };
                let mut subdirectories = Vec::new();
                for entry in entries {
                    match self.process_entry(&entry).await {
                        Ok(WalkEntry::File(file)) => yield Ok(file),
                        Ok(WalkEntry::Descend(dir)) => subdirectories.push(dir),
                        Ok(WalkEntry::Skip) => {},
                        Err(e) => yield Err(e),
                    }
                }
                // Reversed so the stack pops them in name order.
                stack.extend(subdirectories.into_iter().rev());
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;

    fn touch(root: &Path, relative: &str, contents: &[u8]) {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    async fn list(backend: &LocalBackend) -> Vec<PathBuf> {
        let files: Vec<FileInfo> = backend.list_stream().try_collect().await.unwrap();
        files.into_iter().map(|file| file.path).collect()
    }

    #[test]
    fn test_new_rejects_file_root() {
        let temp_dir = tempfile::tempdir().unwrap();
        touch(temp_dir.path(), "file.pdf", b"data");
        let err = LocalBackend::new(temp_dir.path().join("file.pdf")).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidRoot(_)));
    }

    #[test]
    fn test_new_makes_root_absolute() {
        let backend = LocalBackend::new("relative/books").unwrap();
        assert!(backend.root().is_absolute());
        assert!(backend.root().ends_with("relative/books"));
    }

    #[tokio::test]
    async fn test_list_is_depth_first_and_sorted() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path();
        touch(root, "b/two.pdf", b"2");
        touch(root, "a/z/deep.chm", b"3");
        touch(root, "a/one.pdf", b"1");
        touch(root, "top.pdf", b"0");
        touch(root, ".hidden/inside.pdf", b"4");
        let backend = LocalBackend::new(root).unwrap();
        let expected: Vec<PathBuf> =
            ["top.pdf", ".hidden/inside.pdf", "a/one.pdf", "a/z/deep.chm", "b/two.pdf"].iter().map(PathBuf::from).collect();
        assert_eq!(list(&backend).await, expected);
        // Same tree, same order.
        assert_eq!(list(&backend).await, expected);
    }

    #[tokio::test]
    async fn test_list_is_relative_to_root() {
        let temp_dir = tempfile::tempdir().unwrap();
        touch(temp_dir.path(), "shelf/book.pdf", b"Hello, world!");
        let backend = LocalBackend::new(temp_dir.path()).unwrap();
        let files: Vec<FileInfo> = backend.list_stream().try_collect().await.unwrap();
        assert_eq!(files, vec![FileInfo::new("shelf/book.pdf")]);
        assert_eq!(backend.absolute_path(&files[0]), temp_dir.path().join("shelf/book.pdf"));
    }

    #[tokio::test]
    async fn test_list_empty_and_missing_root() {
        let temp_dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new(temp_dir.path()).unwrap();
        assert!(list(&backend).await.is_empty());
        let backend = LocalBackend::new(temp_dir.path().join("nonexistent")).unwrap();
        assert!(list(&backend).await.is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlinks() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path();
        touch(root, "real/book.pdf", b"data");
        std::os::unix::fs::symlink(root.join("real/book.pdf"), root.join("linked.pdf")).unwrap();
        std::os::unix::fs::symlink(root.join("real"), root.join("loop")).unwrap();
        std::os::unix::fs::symlink(root.join("gone.pdf"), root.join("broken.pdf")).unwrap();
        let backend = LocalBackend::new(root).unwrap();
        assert_eq!(list(&backend).await, vec![PathBuf::from("linked.pdf"), PathBuf::from("real/book.pdf")]);
    }
}
