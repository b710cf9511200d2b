//! `figment` provider for the plain `key = value` rc file format.
//!
//! - `#` starts a comment line
//! - blank lines, lines without `=`, and unrecognized keys are ignored
//! - keys and values are trimmed; a later duplicate key wins
//!
//! A file that doesn't exist provides nothing rather than failing, so that
//! environment variables alone can configure a first run.

use crate::setting::Setting;
use figment::value::{Dict, Map, Value};
use figment::{Metadata, Profile, Provider};
use std::path::{Path, PathBuf};

pub struct RcFile {
    path: PathBuf,
}
impl RcFile {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self { path: path.as_ref().to_path_buf() }
    }

    pub fn parse(contents: &str) -> Dict {
        contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.starts_with('#'))
            .filter_map(|line| line.split_once('='))
            .map(|(key, value)| (key.trim(), value.trim()))
            .filter(|(key, _)| key.parse::<Setting>().is_ok())
            .map(|(key, value)| (key.to_string(), Value::from(value.to_string())))
            .collect()
    }
}
impl Provider for RcFile {
    fn metadata(&self) -> Metadata {
        Metadata::named(format!("rc file `{}`", self.path.display()))
    }

    fn data(&self) -> Result<Map<Profile, Dict>, figment::Error> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(err) => return Err(format!("cannot read {}: {err}", self.path.display()).into()),
        };
        Ok(Profile::Default.collect(Self::parse(&contents)))
    }
}
