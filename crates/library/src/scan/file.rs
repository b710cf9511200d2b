use crate::scan::error::{ErrorKind, Result};
use exn::ResultExt;
use libris_cache::{Entry, Repository};
use libris_extract::extract;
use libris_storage::{FileInfo, LocalBackend};
use tracing::instrument;

/// Adds a single listed file to the store.
///
/// Metadata extraction cannot fail: anything unreadable is titled after its
/// file name instead. Only the store write can fail.
#[instrument(level = "debug", skip_all, fields(path = %file.path.display()))]
pub(crate) async fn scan_file(backend: &LocalBackend, cache: &Repository, file: &FileInfo) -> Result<Entry> {
    let path = backend.absolute_path(file);
    let metadata = extract(&path);
    let entry = cache.add(&path, &metadata.title, &metadata.author).await.or_raise(|| ErrorKind::Cache)?;
    tracing::debug!(id = entry.id, title = %entry.title, "Added book");
    Ok(entry)
}
