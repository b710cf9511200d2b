pub mod error;
mod file;
mod local;

pub use crate::file::FileInfo;
pub use crate::local::{FileInfoStream, LocalBackend};
