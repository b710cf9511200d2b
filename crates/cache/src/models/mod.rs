mod entry;

pub use self::entry::{Entry, EntryId};
pub(crate) use self::entry::EntryRow;
