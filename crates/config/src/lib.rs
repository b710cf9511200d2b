//! Configuration for libris.
//!
//! Settings come from a `key = value` rc file, overridden by `LIBRIS_*`
//! environment variables (`LIBRIS_DIR`, `LIBRIS_DBFILE`, ...). Every setting
//! is optional while loading; strict loads and saves insist on all of them.

pub mod error;
mod rc;
mod setting;

use std::io::Write;
use std::path::{Path, PathBuf};

use exn::ResultExt;
use figment::Figment;
use figment::providers::Env;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::{ErrorKind, Result};
pub use crate::rc::RcFile;
pub use crate::setting::Setting;

pub const ENV_PREFIX: &str = "LIBRIS_";
pub const CONFIG_FILENAME: &str = "librisrc";
pub const DATABASE_FILENAME: &str = "books.db";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Where this configuration is saved to.
    #[serde(skip)]
    path: PathBuf,
    #[serde(default)]
    dir: Option<String>,
    #[serde(default)]
    dbfile: Option<String>,
    #[serde(default)]
    pdfcmd: Option<String>,
    #[serde(default)]
    chmcmd: Option<String>,
    #[serde(default)]
    showcmd: Option<String>,
}

impl Config {
    /// An empty configuration that will be saved to `path`.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self { path: path.as_ref().to_path_buf(), ..Default::default() }
    }

    /// A configuration for the library at `dir`, with every other setting
    /// filled in from the platform defaults.
    pub fn with_defaults(path: impl AsRef<Path>, dir: impl AsRef<Path>) -> Self {
        let mut config = Self::new(path);
        config.dir = Some(dir.as_ref().display().to_string());
        config.dbfile = Some(default_database_path().display().to_string());
        config.pdfcmd = Some(default_open_command().to_string());
        config.chmcmd = Some(default_open_command().to_string());
        config.showcmd = Some(default_reveal_command().to_string());
        config
    }

    /// Load the rc file at `path` (a missing file counts as empty) and apply
    /// environment overrides.
    ///
    /// With `strict`, fails with [`ErrorKind::Incomplete`] unless every
    /// recognized setting ends up with a value.
    #[instrument(level = "debug", skip(path), fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>, strict: bool) -> Result<Self> {
        let path = path.as_ref();
        let keys = Setting::ALL.map(|setting| setting.key());
        let mut config: Self = Figment::new()
            .merge(RcFile::new(path))
            .merge(Env::prefixed(ENV_PREFIX).only(&keys))
            .extract()
            .or_raise(|| ErrorKind::Invalid)?;
        config.path = path.to_path_buf();
        // An empty value is as good as no value at all.
        for setting in Setting::ALL {
            if config.slot(setting).as_deref().is_some_and(str::is_empty) {
                *config.slot(setting) = None;
            }
        }
        if strict {
            config.ensure_complete()?;
        }
        Ok(config)
    }

    /// Write every set value back to the file this configuration belongs to.
    ///
    /// The file is replaced atomically. With `strict`, an incomplete
    /// configuration is refused and nothing is written.
    #[instrument(level = "debug", skip(self), fields(path = %self.path.display()))]
    pub fn save(&self, strict: bool) -> Result<()> {
        if strict {
            self.ensure_complete()?;
        }
        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(parent).or_raise(|| ErrorKind::Io)?;
        let mut file = tempfile::NamedTempFile::new_in(parent).or_raise(|| ErrorKind::Io)?;
        for setting in Setting::ALL {
            if let Some(value) = self.value(setting) {
                writeln!(file, "{} = {value}", setting.key()).or_raise(|| ErrorKind::Io)?;
            }
        }
        file.persist(&self.path).or_raise(|| ErrorKind::Io)?;
        tracing::debug!("Saved configuration");
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Recognized settings that have no value.
    pub fn missing(&self) -> Vec<&'static str> {
        Setting::ALL.into_iter().filter(|setting| self.value(*setting).is_none()).map(|setting| setting.key()).collect()
    }

    pub fn is_complete(&self) -> bool {
        self.missing().is_empty()
    }

    fn ensure_complete(&self) -> Result<()> {
        let missing = self.missing();
        if !missing.is_empty() {
            exn::bail!(ErrorKind::Incomplete(missing));
        }
        Ok(())
    }

    /// Look up a setting by name.
    pub fn get(&self, name: &str) -> Result<Option<&str>> {
        Ok(self.value(name.parse()?))
    }

    /// Change a setting by name. Setting an empty value unsets it.
    ///
    /// Only changes this in-memory value; call [`save()`](Self::save) to persist.
    pub fn set(&mut self, name: &str, value: impl Into<String>) -> Result<()> {
        let value = value.into();
        *self.slot(name.parse()?) = (!value.is_empty()).then_some(value);
        Ok(())
    }

    pub fn value(&self, setting: Setting) -> Option<&str> {
        match setting {
            Setting::Dir => self.dir.as_deref(),
            Setting::DbFile => self.dbfile.as_deref(),
            Setting::PdfCmd => self.pdfcmd.as_deref(),
            Setting::ChmCmd => self.chmcmd.as_deref(),
            Setting::ShowCmd => self.showcmd.as_deref(),
        }
    }

    fn slot(&mut self, setting: Setting) -> &mut Option<String> {
        match setting {
            Setting::Dir => &mut self.dir,
            Setting::DbFile => &mut self.dbfile,
            Setting::PdfCmd => &mut self.pdfcmd,
            Setting::ChmCmd => &mut self.chmcmd,
            Setting::ShowCmd => &mut self.showcmd,
        }
    }

    pub fn library_dir(&self) -> Option<PathBuf> {
        self.dir.as_ref().map(PathBuf::from)
    }

    pub fn database_path(&self) -> Option<PathBuf> {
        self.dbfile.as_ref().map(PathBuf::from)
    }

    /// The command configured to open files of `file_type`, if any.
    pub fn opener(&self, file_type: &str) -> Option<&str> {
        Setting::opener(file_type).and_then(|setting| self.value(setting))
    }

    pub fn reveal_command(&self) -> Option<&str> {
        self.showcmd.as_deref()
    }
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("net", "libris", "libris")
}

/// Platform configuration directory + `librisrc`, or `./librisrc` when no
/// home directory can be determined.
pub fn default_config_path() -> PathBuf {
    project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILENAME)).unwrap_or_else(|| PathBuf::from(CONFIG_FILENAME))
}

/// Platform data directory + `books.db`, or `./books.db` when no home
/// directory can be determined.
pub fn default_database_path() -> PathBuf {
    project_dirs().map(|dirs| dirs.data_dir().join(DATABASE_FILENAME)).unwrap_or_else(|| PathBuf::from(DATABASE_FILENAME))
}

/// The desktop's "open with default application" command.
pub fn default_open_command() -> &'static str {
    if cfg!(target_os = "macos") { "open" } else { "xdg-open" }
}

/// The desktop's "show in file manager" command. On macOS this selects the
/// file in Finder; elsewhere the containing directory is opened.
pub fn default_reveal_command() -> &'static str {
    if cfg!(target_os = "macos") { "open -R" } else { "xdg-open" }
}
