//! PDF document-information dictionary reader.

use crate::error::{ErrorKind, Result};
use crate::models::Metadata;
use exn::ResultExt;
use lopdf::{Dictionary, Document, Object};
use std::any::Any;
use std::cell::Cell;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::Once;
use tracing::instrument;

thread_local! {
    static SILENCED: Cell<bool> = const { Cell::new(false) };
}
static SILENCING_HOOK: Once = Once::new();

/// Read the title and author from a PDF's trailer `/Info` dictionary.
///
/// Returns `Ok(None)` when the document parses but carries no usable title
/// (no `/Info`, or an empty `/Title`). An error means the file itself could
/// not be parsed.
#[instrument(level = "trace", skip_all, fields(path = %path.display()))]
pub fn read_metadata(path: &Path) -> Result<Option<Metadata>> {
    // lopdf is not panic-free on hostile input.
    let document = match silenced(|| Document::load(path)) {
        Ok(loaded) => loaded.or_raise(|| ErrorKind::Malformed("PDF"))?,
        Err(panic) => {
            tracing::debug!(panic = %panic, "PDF parser panicked");
            exn::bail!(ErrorKind::Malformed("PDF"))
        },
    };
    let Some(info) = info_dictionary(&document) else {
        return Ok(None);
    };
    let title = text_field(&document, info, b"Title");
    if title.is_empty() {
        return Ok(None);
    }
    Ok(Some(Metadata { title, author: text_field(&document, info, b"Author") }))
}

/// Run `f`, turning a panic into its message without the panic hook
/// printing anything for this thread.
fn silenced<T>(f: impl FnOnce() -> T) -> std::result::Result<T, String> {
    SILENCING_HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if !SILENCED.with(Cell::get) {
                previous(info);
            }
        }));
    });
    SILENCED.with(|silenced| silenced.set(true));
    let outcome = panic::catch_unwind(AssertUnwindSafe(f));
    SILENCED.with(|silenced| silenced.set(false));
    outcome.map_err(|payload| panic_message(payload.as_ref()))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|message| message.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

fn info_dictionary(document: &Document) -> Option<&Dictionary> {
    match document.trailer.get(b"Info").ok()? {
        Object::Reference(id) => document.get_dictionary(*id).ok(),
        Object::Dictionary(dictionary) => Some(dictionary),
        _ => None,
    }
}

fn text_field(document: &Document, info: &Dictionary, key: &[u8]) -> String {
    let object = match info.get(key) {
        Ok(Object::Reference(id)) => document.get_object(*id).ok(),
        Ok(object) => Some(object),
        Err(_) => None,
    };
    object
        .and_then(|object| lopdf::decode_text_string(object).ok())
        // lopdf keeps the UTF-8 byte order mark.
        .map(|text| text.trim_start_matches('\u{feff}').trim_end_matches('\0').trim().to_string())
        .unwrap_or_default()
}
