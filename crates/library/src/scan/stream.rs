use crate::error::{ErrorKind as LibraryErrorKind, Result as LibraryResult};
use crate::scan::error::{ErrorKind as ScanErrorKind, Result as ScanResult};
use crate::scan::file::scan_file;
use async_stream::stream;
use exn::ResultExt;
use futures::{Stream, StreamExt};
use libris_cache::Repository;
use libris_extract::is_qualifying;
use libris_storage::LocalBackend;
use std::pin::Pin;
use tracing::instrument;

/// Number of added files between two [`Progress`] reports.
pub const DEFAULT_BATCH_SIZE: usize = 5;

pub type ProgressStream<'a> = Pin<Box<dyn Stream<Item = LibraryResult<Progress>> + 'a>>;

/// Progress report emitted by [`scan`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// Files added since the previous report. Never more than the batch size.
    pub batch: u64,
    /// Files added since the scan started.
    pub total: u64,
}
impl Progress {
    pub fn new(batch: u64, total: u64) -> Self {
        Self { batch, total }
    }
}

/// Streams [`Progress`] while adding every qualifying file under `backend`
/// to `cache`.
///
/// A report is emitted each time `batch_size` files have been added, then
/// once more when the walk is complete with whatever is left of the last
/// batch (possibly zero). The stream therefore always yields at least one
/// report; an empty tree yields exactly `Progress { batch: 0, total: 0 }`.
///
/// Dotfiles and files that are not PDF or CHM are skipped without being
/// counted. Per-file failures (an unreadable directory, a failed store write)
/// are yielded as `Err` items without terminating the stream.
///
/// Nothing happens until the stream is polled, and dropping it part-way
/// leaves every entry added so far in the store.
pub fn scan(backend: LocalBackend, cache: Repository, batch_size: usize) -> impl Stream<Item = LibraryResult<Progress>> {
    // `rustfmt` does not format macro-specific syntax such as
    // `for await` even using the parentheses trick.
    stream! {
        for await progress in scan_inner(&backend, &cache, batch_size.max(1) as u64) {
            yield progress.or_raise(|| LibraryErrorKind::Scan);
        }
    }
}

fn scan_inner<'a>(
    backend: &'a LocalBackend,
    cache: &'a Repository,
    batch_size: u64,
) -> impl Stream<Item = ScanResult<Progress>> + 'a {
    stream!({
        tracing::info!(root = %backend.root().display(), "Scanning library");
        let mut batch = 0;
        let mut total = 0;
        let mut files = backend.list_stream();
        while let Some(file) = files.next().await {
            let file = match file.or_raise(|| ScanErrorKind::Storage) {
                Ok(file) => file,
                Err(e) => {
                    yield Err(e);
                    continue;
                },
            };
            if !is_qualifying(&file.path) {
                continue;
            }
            if let Err(e) = scan_file(backend, cache, &file).await {
                yield Err(e);
                continue;
            }
            batch += 1;
            total += 1;
            if batch == batch_size {
                yield Ok(Progress::new(batch, total));
                batch = 0;
            }
        }
        tracing::info!(total, "Library scan complete");
        yield Ok(Progress::new(batch, total));
    })
}

/// Count the files a [`scan`] of the same tree would add.
///
/// An independent walk; parts of the tree that cannot be read are logged
/// and left out of the count.
#[instrument(level = "debug", skip_all, fields(root = %backend.root().display()))]
pub async fn count_qualifying_files(backend: &LocalBackend) -> u64 {
    let mut count = 0;
    let mut files = backend.list_stream();
    while let Some(file) = files.next().await {
        match file {
            Ok(file) if is_qualifying(&file.path) => count += 1,
            Ok(_) => {},
            Err(err) => tracing::warn!(error = ?err, "Skipping unreadable part of the library"),
        }
    }
    count
}
