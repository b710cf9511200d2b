//! Scanning a book library into the store, and the [`LibraryService`] façade
//! that views use to search, open and rebuild it.

pub mod error;
mod launch;
pub mod scan;
mod service;
mod view;

pub use crate::launch::{Launch, Launcher, ProcessLauncher};
pub use crate::scan::{DEFAULT_BATCH_SIZE, Progress, ProgressStream};
pub use crate::service::LibraryService;
pub use crate::view::{Startup, View};
