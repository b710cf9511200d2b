//! libris CLI entry point

mod cli;
mod console;

use crate::cli::{Cli, Command};
use crate::console::ConsoleView;
use clap::Parser;
use exn::ResultExt;
use libris_config::error::{ErrorKind as ConfigErrorKind, Result as ConfigResult};
use libris_config::{Config, default_config_path};
use libris_library::LibraryService;
use std::path::Path;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);

    if let Err(e) = validate_inputs(&cli) {
        eprintln!("Error: {e}");
        return ExitCode::FAILURE;
    }

    let path = cli.config.clone().unwrap_or_else(default_config_path);
    let config = match load_config(&path, &cli.command) {
        Ok(config) => config,
        Err(err) => {
            tracing::debug!(error = ?err, "Could not load configuration");
            eprintln!("Error: {}", *err);
            if matches!(&*err, ConfigErrorKind::Incomplete(_)) {
                eprintln!("\n  Tip: Run `libris init <DIR>` to set up a library.");
            }
            return ExitCode::FAILURE;
        },
    };

    let mut service = match LibraryService::open(config).await {
        Ok(service) => service,
        Err(err) => {
            tracing::debug!(error = ?err, "Could not open the library");
            eprintln!("Error: {}", *err);
            return ExitCode::FAILURE;
        },
    };
    service.add_view(ConsoleView::new(cli.command, std::io::stdout()));
    let outcome = service.run().await;

    // The store is closed on every path, including a failed command.
    if let Err(err) = service.shutdown().await {
        tracing::warn!(error = ?err, "Could not close the library cleanly");
    }
    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::debug!(error = ?err, "Command failed");
            eprintln!("Error: {}", *err);
            ExitCode::FAILURE
        },
    }
}

fn init_logging(cli: &Cli) {
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn validate_inputs(cli: &Cli) -> Result<(), String> {
    if let Command::Init { dir, .. } = &cli.command
        && !dir.is_dir()
    {
        return Err(format!(
            "Library directory does not exist: {}\n\n  Tip: Point `init` at the directory holding your PDF and CHM files.\n  Example: libris init ~/Books",
            dir.display()
        ));
    }
    Ok(())
}

/// `init` builds (and saves) a fresh configuration; every other command
/// needs a complete one on disk.
fn load_config(path: &Path, command: &Command) -> ConfigResult<Config> {
    let Command::Init { dir, dbfile, pdfcmd, chmcmd, showcmd } = command else {
        return Config::load(path, true);
    };
    let dir = std::path::absolute(dir).or_raise(|| ConfigErrorKind::Io)?;
    let mut config = Config::with_defaults(path, dir);
    if let Some(dbfile) = dbfile {
        let dbfile = std::path::absolute(dbfile).or_raise(|| ConfigErrorKind::Io)?;
        config.set("dbfile", dbfile.display().to_string())?;
    }
    for (name, value) in [("pdfcmd", pdfcmd), ("chmcmd", chmcmd), ("showcmd", showcmd)] {
        if let Some(value) = value {
            config.set(name, value.as_str())?;
        }
    }
    config.save(true)?;
    tracing::info!(path = %path.display(), "Saved configuration");
    Ok(config)
}
