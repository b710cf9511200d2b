pub mod chm;
pub mod error;
mod format;
mod models;
pub mod pdf;

use std::path::Path;

use tracing::instrument;

pub use crate::format::{Format, file_type, is_hidden, is_qualifying};
pub use crate::models::Metadata;

/// Easy, top-level entrypoint for getting a title and author for a document.
///
/// Never fails: embedded metadata is preferred, and whenever it is missing,
/// blank or unreadable the title is derived from the file name instead (see
/// [`Metadata::from_filename`]). Reader errors are logged, not returned.
///
/// Files that are not a recognised [`Format`] go straight to the fallback.
#[instrument(level = "debug", skip_all, fields(path = %path.display()))]
pub fn extract(path: &Path) -> Metadata {
    let embedded = match Format::from_path(path) {
        Some(Format::Pdf) => pdf::read_metadata(path),
        Some(Format::Chm) => chm::read_metadata(path),
        None => Ok(None),
    };
    match embedded {
        Ok(Some(metadata)) => metadata,
        Ok(None) => Metadata::from_filename(path),
        Err(err) => {
            tracing::debug!(error = ?err, "Unreadable document metadata, using filename");
            Metadata::from_filename(path)
        },
    }
}
