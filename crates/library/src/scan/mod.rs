pub(crate) mod error;
mod file;
mod stream;

pub use self::stream::{DEFAULT_BATCH_SIZE, Progress, ProgressStream, count_qualifying_files, scan};
