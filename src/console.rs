//! Plain terminal front-end: runs one command against the library and prints
//! the outcome.

use crate::cli::{Command, ConfigCommand, Selection};
use async_trait::async_trait;
use exn::ResultExt;
use futures::StreamExt;
use libris_cache::Entry;
use libris_config::Setting;
use libris_library::error::{ErrorKind, Result};
use libris_library::{Launch, LibraryService, Startup, View};
use std::io::Write;

/// Runs a single [`Command`] when the service starts.
pub struct ConsoleView<W> {
    command: Option<Command>,
    out: W,
}

impl<W: Write> ConsoleView<W> {
    pub fn new(command: Command, out: W) -> Self {
        Self { command: Some(command), out }
    }

    async fn execute(&mut self, command: Command, service: &mut LibraryService) -> Result<()> {
        match command {
            Command::Init { .. } | Command::Reload => self.reload(service).await,
            Command::Search { term } => {
                let entries = service.search(&term).await?;
                self.print_entries(&entries)
            },
            Command::List => {
                let entries = service.list_all().await?;
                self.print_entries(&entries)
            },
            Command::Open(selection) => {
                Self::select(service, &selection).await?;
                let outcome = service.open_entry_at_position(selection.index()).await?;
                self.report(outcome)
            },
            Command::Reveal(selection) => {
                Self::select(service, &selection).await?;
                let outcome = service.reveal_entry_at_position(selection.index()).await?;
                self.report(outcome)
            },
            Command::Count => {
                let count = service.count_books().await?;
                self.print(format_args!("{count}"));
                Ok(())
            },
            Command::Config(command) => self.configure(command, service),
        }
    }

    /// Rebuild the listing a position refers to.
    async fn select(service: &mut LibraryService, selection: &Selection) -> Result<()> {
        match &selection.term {
            Some(term) => service.search(term).await?,
            None => service.list_all().await?,
        };
        Ok(())
    }

    async fn reload(&mut self, service: &mut LibraryService) -> Result<()> {
        let found = service.count_books().await?;
        self.print(format_args!("{found} files found"));
        let mut progress = service.reload_library().await?;
        let mut added = 0;
        let mut failed = 0;
        while let Some(report) = progress.next().await {
            match report {
                Ok(report) => {
                    added = report.total;
                    if report.batch > 0 {
                        self.print(format_args!("{added}/{found}"));
                    }
                },
                Err(err) => {
                    failed += 1;
                    tracing::warn!(error = ?err, "Could not add a file");
                },
            }
        }
        self.print(format_args!("{added} books added"));
        if failed > 0 {
            self.print(format_args!("{failed} files could not be added"));
        }
        Ok(())
    }

    fn configure(&mut self, command: ConfigCommand, service: &mut LibraryService) -> Result<()> {
        match command {
            ConfigCommand::Get { name } => {
                let value = service.get_setting(&name).or_raise(|| ErrorKind::Config)?;
                self.print(format_args!("{}", value.unwrap_or_default()));
                Ok(())
            },
            ConfigCommand::Set { name, value } => {
                service.set_setting(&name, &value).or_raise(|| ErrorKind::Config)?;
                service.persist_settings().or_raise(|| ErrorKind::Config)
            },
            ConfigCommand::Show => {
                for setting in Setting::ALL {
                    let value = service.get_setting(setting.key()).or_raise(|| ErrorKind::Config)?;
                    self.print(format_args!("{setting} = {}", value.unwrap_or_default()));
                }
                Ok(())
            },
        }
    }

    fn print_entries(&mut self, entries: &[Entry]) -> Result<()> {
        if entries.is_empty() {
            self.print(format_args!("No books found"));
            return Ok(());
        }
        let width = entries.len().to_string().len();
        for (index, entry) in entries.iter().enumerate() {
            let position = index + 1;
            if entry.author.is_empty() {
                self.print(format_args!("{position:>width$}  {}  [{}]", entry.title, entry.filename));
            } else {
                self.print(format_args!("{position:>width$}  {} by {}  [{}]", entry.title, entry.author, entry.filename));
            }
        }
        Ok(())
    }

    fn report(&mut self, outcome: Launch) -> Result<()> {
        match outcome {
            Launch::Started => {},
            Launch::Failed { reason } => self.print(format_args!("Warning: {reason}")),
        }
        Ok(())
    }

    /// Output is best effort; a closed pipe must not fail the command.
    fn print(&mut self, line: std::fmt::Arguments<'_>) {
        if let Err(err) = writeln!(self.out, "{line}") {
            tracing::debug!(error = %err, "Could not write output");
        }
    }
}

impl<W: Write> View for ConsoleView<W> {
    fn name(&self) -> &str {
        "console"
    }

    fn startup(&mut self) -> Option<&mut dyn Startup> {
        Some(self)
    }
}

#[async_trait(?Send)]
impl<W: Write> Startup for ConsoleView<W> {
    async fn start(&mut self, service: &mut LibraryService) -> Result<()> {
        match self.command.take() {
            Some(command) => self.execute(command, service).await,
            None => Ok(()),
        }
    }
}
