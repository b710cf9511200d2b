//! The façade presentation layers drive.

use crate::error::{ErrorKind, Result};
use crate::launch::{Launch, Launcher, ProcessLauncher};
use crate::scan::{DEFAULT_BATCH_SIZE, ProgressStream, count_qualifying_files, scan};
use crate::view::View;
use exn::{OptionExt, ResultExt};
use libris_cache::{Database, Entry, EntryId, Repository};
use libris_config::Config;
use libris_config::error::Result as ConfigResult;
use libris_storage::LocalBackend;
use std::path::PathBuf;
use tracing::instrument;

/// Everything a view needs from the library.
///
/// Results handed out by [`search()`](Self::search) and
/// [`list_all()`](Self::list_all) are remembered by position, so that the
/// view can refer to "the third row" in [`open_entry_at_position()`](Self::open_entry_at_position)
/// and [`reveal_entry_at_position()`](Self::reveal_entry_at_position). Each
/// new list replaces the previous one entirely.
pub struct LibraryService {
    config: Config,
    database: Database,
    cache: Repository,
    launcher: Box<dyn Launcher>,
    positions: Vec<EntryId>,
    views: Vec<Box<dyn View>>,
    started: bool,
}

impl LibraryService {
    pub fn new(config: Config, database: Database) -> Self {
        let cache = Repository::from(&database);
        Self {
            config,
            database,
            cache,
            launcher: Box::new(ProcessLauncher),
            positions: Vec::new(),
            views: Vec::new(),
            started: false,
        }
    }

    /// Open the store named by the `dbfile` setting, creating it (and its
    /// directory) if needed.
    #[instrument(level = "debug", skip_all)]
    pub async fn open(config: Config) -> Result<Self> {
        let path = config.database_path().ok_or_raise(|| ErrorKind::NotConfigured("dbfile"))?;
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).or_raise(|| ErrorKind::Cache)?;
        }
        let database = Database::connect(&path).await.or_raise(|| ErrorKind::Cache)?;
        Ok(Self::new(config, database))
    }

    pub fn with_launcher(mut self, launcher: impl Launcher + 'static) -> Self {
        self.launcher = Box::new(launcher);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    // =========================================================================
    // Lists
    // =========================================================================

    /// Entries matching `term` (see [`Repository::search`]), remembered by
    /// position.
    pub async fn search(&mut self, term: &str) -> Result<Vec<Entry>> {
        let entries = self.cache.search(term).await.or_raise(|| ErrorKind::Cache)?;
        self.remember(&entries);
        Ok(entries)
    }

    /// Every entry, remembered by position.
    pub async fn list_all(&mut self) -> Result<Vec<Entry>> {
        let entries = self.cache.list_all().await.or_raise(|| ErrorKind::Cache)?;
        self.remember(&entries);
        Ok(entries)
    }

    fn remember(&mut self, entries: &[Entry]) {
        self.positions = entries.iter().map(|entry| entry.id).collect();
    }

    /// The entry at `position` in the most recent list.
    pub async fn entry_at(&self, position: usize) -> Result<Entry> {
        let id = *self.positions.get(position).ok_or_raise(|| ErrorKind::NoSuchPosition(position))?;
        self.cache.get_by_id(id).await.or_raise(|| ErrorKind::Cache)
    }

    // =========================================================================
    // Actions
    // =========================================================================

    /// Open the entry at `position` with the command configured for its file
    /// type.
    ///
    /// Fails with [`ErrorKind::UnsupportedFileType`] before anything is
    /// launched if there is no such command. A launch that goes wrong is not
    /// an error; it is reported as [`Launch::Failed`].
    #[instrument(level = "debug", skip(self))]
    pub async fn open_entry_at_position(&self, position: usize) -> Result<Launch> {
        let entry = self.entry_at(position).await?;
        let file_type = entry.file_type();
        let command = self.config.opener(&file_type).ok_or_raise(|| ErrorKind::UnsupportedFileType(file_type.clone()))?;
        Ok(self.start(command, entry.full_path()))
    }

    /// Show the entry at `position` in the file manager.
    ///
    /// On macOS the file itself is revealed (and selected); elsewhere file
    /// managers only understand directories, so its directory is opened.
    #[instrument(level = "debug", skip(self))]
    pub async fn reveal_entry_at_position(&self, position: usize) -> Result<Launch> {
        let entry = self.entry_at(position).await?;
        let command = self.config.reveal_command().ok_or_raise(|| ErrorKind::NotConfigured("showcmd"))?;
        let target = if cfg!(target_os = "macos") { entry.full_path() } else { entry.directory };
        Ok(self.start(command, target))
    }

    fn start(&self, command: &str, target: PathBuf) -> Launch {
        match self.launcher.launch(command, &target) {
            Ok(()) => Launch::Started,
            Err(err) => {
                tracing::warn!(error = ?err, command, target = %target.display(), "Launch failed");
                Launch::Failed { reason: (*err).to_string() }
            },
        }
    }

    // =========================================================================
    // Library
    // =========================================================================

    fn backend(&self) -> Result<LocalBackend> {
        let dir = self.config.library_dir().ok_or_raise(|| ErrorKind::NotConfigured("dir"))?;
        LocalBackend::new(dir).or_raise(|| ErrorKind::Storage)
    }

    /// Empty the store, then return the scan that rebuilds it.
    ///
    /// The store is cleared before this returns; the scan itself only runs
    /// as the returned stream is polled. Previously listed positions are
    /// forgotten.
    #[instrument(level = "info", skip(self))]
    pub async fn reload_library(&mut self) -> Result<ProgressStream<'static>> {
        let backend = self.backend()?;
        let removed = self.cache.clear().await.or_raise(|| ErrorKind::Cache)?;
        tracing::info!(removed, "Cleared library");
        self.positions.clear();
        Ok(Box::pin(scan(backend, self.cache.clone(), DEFAULT_BATCH_SIZE)))
    }

    /// Number of files a reload would add.
    pub async fn count_books(&self) -> Result<u64> {
        Ok(count_qualifying_files(&self.backend()?).await)
    }

    // =========================================================================
    // Settings
    // =========================================================================

    pub fn get_setting(&self, name: &str) -> ConfigResult<Option<String>> {
        Ok(self.config.get(name)?.map(str::to_string))
    }

    /// Changes take effect for the next operation that reads the setting;
    /// an already open store stays open.
    pub fn set_setting(&mut self, name: &str, value: &str) -> ConfigResult<()> {
        self.config.set(name, value)
    }

    /// Save the settings; refuses to write an incomplete configuration.
    pub fn persist_settings(&self) -> ConfigResult<()> {
        self.config.save(true)
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    pub fn add_view(&mut self, view: impl View + 'static) {
        self.views.push(Box::new(view));
    }

    /// Run every registered view's startup hook, in registration order.
    ///
    /// Hooks run once per service: calling this again does nothing.
    pub async fn run(&mut self) -> Result<()> {
        if self.started {
            return Ok(());
        }
        self.started = true;
        let mut views = std::mem::take(&mut self.views);
        let mut result = Ok(());
        for view in &mut views {
            let name = view.name().to_string();
            if let Some(startup) = view.startup() {
                tracing::debug!(view = %name, "Starting view");
                result = startup.start(self).await;
                if result.is_err() {
                    break;
                }
            }
        }
        views.append(&mut self.views);
        self.views = views;
        result
    }

    /// Close the store. Consumes the service; the caller decides how the
    /// process ends.
    pub async fn shutdown(self) -> Result<()> {
        self.database.close().await;
        tracing::debug!("Library service shut down");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::Progress;
    use crate::view::Startup;
    use async_trait::async_trait;
    use futures::TryStreamExt;
    use std::cell::RefCell;
    use std::path::Path;
    use std::rc::Rc;
    use tempfile::TempDir;

    type Calls = Rc<RefCell<Vec<(String, PathBuf)>>>;

    #[derive(Default, Clone)]
    struct RecordingLauncher {
        calls: Calls,
    }
    impl Launcher for RecordingLauncher {
        fn launch(&self, command: &str, target: &Path) -> Result<()> {
            self.calls.borrow_mut().push((command.to_string(), target.to_path_buf()));
            Ok(())
        }
    }

    struct BrokenLauncher;
    impl Launcher for BrokenLauncher {
        fn launch(&self, _command: &str, _target: &Path) -> Result<()> {
            exn::bail!(ErrorKind::Launch("viewer exploded".to_string()))
        }
    }

    fn touch(root: &Path, relative: &str) {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, b"not really a document").unwrap();
    }

    /// A library of three PDFs and one CHM, with no CHM opener configured.
    async fn service() -> (TempDir, LibraryService, Calls) {
        let temp_dir = tempfile::tempdir().unwrap();
        let books = temp_dir.path().join("books");
        touch(&books, "Zen.And.The.Art.pdf");
        touch(&books, "scifi/Snow.Crash.pdf");
        touch(&books, "scifi/Anathem.pdf");
        touch(&books, "help/Reference.chm");
        touch(&books, "scifi/.Snow.Crash.pdf");
        let mut config = Config::new(temp_dir.path().join("librisrc"));
        config.set("dir", books.display().to_string()).unwrap();
        config.set("dbfile", temp_dir.path().join("books.db").display().to_string()).unwrap();
        config.set("pdfcmd", "evince --fullscreen").unwrap();
        config.set("showcmd", "nautilus").unwrap();
        let database = Database::connect_in_memory().await.unwrap();
        let launcher = RecordingLauncher::default();
        let calls = launcher.calls.clone();
        let service = LibraryService::new(config, database).with_launcher(launcher);
        (temp_dir, service, calls)
    }

    async fn reload(service: &mut LibraryService) -> Vec<Progress> {
        service.reload_library().await.unwrap().try_collect().await.unwrap()
    }

    fn titles(entries: &[Entry]) -> Vec<&str> {
        entries.iter().map(|entry| entry.title.as_str()).collect()
    }

    #[tokio::test]
    async fn test_reload_and_list() {
        let (_temp_dir, mut service, _) = service().await;
        assert_eq!(service.count_books().await.unwrap(), 4);
        assert_eq!(reload(&mut service).await, vec![Progress::new(4, 4)]);
        let entries = service.list_all().await.unwrap();
        assert_eq!(titles(&entries), ["Anathem", "Reference", "Snow Crash", "Zen And The Art"]);
        // Reloading again starts from an empty store.
        reload(&mut service).await;
        assert_eq!(service.list_all().await.unwrap().len(), 4);
        service.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_open_uses_configured_command() {
        let (temp_dir, mut service, calls) = service().await;
        reload(&mut service).await;
        let entries = service.search("snow").await.unwrap();
        assert_eq!(titles(&entries), ["Snow Crash"]);
        assert_eq!(service.open_entry_at_position(0).await.unwrap(), Launch::Started);
        let expected = temp_dir.path().join("books/scifi/Snow.Crash.pdf");
        assert_eq!(*calls.borrow(), vec![("evince --fullscreen".to_string(), expected)]);
        service.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_open_unsupported_file_type() {
        let (_temp_dir, mut service, calls) = service().await;
        reload(&mut service).await;
        let entries = service.search("Reference").await.unwrap();
        assert_eq!(entries.len(), 1);
        let err = service.open_entry_at_position(0).await.unwrap_err();
        assert_eq!(*err, ErrorKind::UnsupportedFileType("chm".to_string()));
        assert!(calls.borrow().is_empty());
        // The position map is untouched by the failure.
        assert_eq!(service.entry_at(0).await.unwrap().title, "Reference");
        service.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_positions_follow_latest_list() {
        let (_temp_dir, mut service, _) = service().await;
        reload(&mut service).await;
        service.list_all().await.unwrap();
        assert_eq!(service.entry_at(3).await.unwrap().title, "Zen And The Art");
        service.search("Anathem").await.unwrap();
        assert_eq!(service.entry_at(0).await.unwrap().title, "Anathem");
        let err = service.entry_at(3).await.unwrap_err();
        assert_eq!(*err, ErrorKind::NoSuchPosition(3));
        // Reloading forgets positions altogether.
        reload(&mut service).await;
        let err = service.open_entry_at_position(0).await.unwrap_err();
        assert_eq!(*err, ErrorKind::NoSuchPosition(0));
        service.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_reveal() {
        let (temp_dir, mut service, calls) = service().await;
        reload(&mut service).await;
        service.search("Anathem").await.unwrap();
        assert_eq!(service.reveal_entry_at_position(0).await.unwrap(), Launch::Started);
        let expected = if cfg!(target_os = "macos") {
            temp_dir.path().join("books/scifi/Anathem.pdf")
        } else {
            temp_dir.path().join("books/scifi")
        };
        assert_eq!(*calls.borrow(), vec![("nautilus".to_string(), expected)]);
        service.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_failed_launch_is_reported() {
        let (_temp_dir, service, _) = service().await;
        let mut service = service.with_launcher(BrokenLauncher);
        reload(&mut service).await;
        service.list_all().await.unwrap();
        let outcome = service.open_entry_at_position(0).await.unwrap();
        assert_eq!(outcome, Launch::Failed { reason: "could not launch: viewer exploded".to_string() });
        service.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_settings_passthrough() {
        let (temp_dir, mut service, _) = service().await;
        assert_eq!(service.get_setting("pdfcmd").unwrap().as_deref(), Some("evince --fullscreen"));
        service.set_setting("chmcmd", "xchm").unwrap();
        assert_eq!(service.get_setting("chmcmd").unwrap().as_deref(), Some("xchm"));
        let err = service.get_setting("colour").unwrap_err();
        assert_eq!(*err, libris_config::error::ErrorKind::UnknownSetting("colour".to_string()));
        let err = service.set_setting("colour", "blue").unwrap_err();
        assert_eq!(*err, libris_config::error::ErrorKind::UnknownSetting("colour".to_string()));
        service.persist_settings().unwrap();
        let saved = std::fs::read_to_string(temp_dir.path().join("librisrc")).unwrap();
        assert!(saved.contains("chmcmd = xchm\n"));
        service.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_unconfigured_library_dir() {
        let database = Database::connect_in_memory().await.unwrap();
        let mut service = LibraryService::new(Config::new("librisrc"), database);
        let err = service.count_books().await.unwrap_err();
        assert_eq!(*err, ErrorKind::NotConfigured("dir"));
        assert!(service.reload_library().await.is_err());
        service.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_open_creates_store() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut config = Config::new(temp_dir.path().join("librisrc"));
        config.set("dbfile", temp_dir.path().join("data/books.db").display().to_string()).unwrap();
        let service = LibraryService::open(config).await.unwrap();
        service.shutdown().await.unwrap();
        assert!(temp_dir.path().join("data/books.db").is_file());
    }

    struct CountingView {
        starts: Rc<RefCell<u32>>,
    }
    impl View for CountingView {
        fn name(&self) -> &str {
            "counting"
        }
        fn startup(&mut self) -> Option<&mut dyn Startup> {
            Some(self)
        }
    }
    #[async_trait(?Send)]
    impl Startup for CountingView {
        async fn start(&mut self, service: &mut LibraryService) -> Result<()> {
            *self.starts.borrow_mut() += 1;
            service.list_all().await?;
            Ok(())
        }
    }

    struct PassiveView;
    impl View for PassiveView {
        fn name(&self) -> &str {
            "passive"
        }
    }

    #[tokio::test]
    async fn test_run_starts_each_view_once() {
        let (_temp_dir, mut service, _) = service().await;
        let starts = Rc::new(RefCell::new(0));
        service.add_view(PassiveView);
        service.add_view(CountingView { starts: starts.clone() });
        service.run().await.unwrap();
        service.run().await.unwrap();
        assert_eq!(*starts.borrow(), 1);
        service.shutdown().await.unwrap();
    }
}
