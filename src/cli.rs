//! Command-line arguments.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// libris - index and search a personal PDF/CHM library
///
/// Books are found by walking the library directory; their titles and
/// authors are read from the files themselves and kept in a local store.
#[derive(Parser, Debug)]
#[command(name = "libris")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Configuration file (defaults to the platform configuration directory)
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Write a configuration for the library at DIR and build the store
    Init {
        #[arg(value_name = "DIR")]
        dir: PathBuf,
        /// Where the store is kept
        #[arg(long, value_name = "FILE")]
        dbfile: Option<PathBuf>,
        /// Command used to open PDF files
        #[arg(long, value_name = "COMMAND")]
        pdfcmd: Option<String>,
        /// Command used to open CHM files
        #[arg(long, value_name = "COMMAND")]
        chmcmd: Option<String>,
        /// Command used to show a book in the file manager
        #[arg(long, value_name = "COMMAND")]
        showcmd: Option<String>,
    },
    /// List books whose title, author or filename contains TERM
    Search {
        #[arg(value_name = "TERM")]
        term: String,
    },
    /// List every book
    List,
    /// Open the book at POSITION in a listing
    Open(Selection),
    /// Show the book at POSITION in the file manager
    Reveal(Selection),
    /// Empty the store and scan the library directory again
    Reload,
    /// Count the books a reload would find
    Count,
    /// Read or change settings
    #[command(subcommand)]
    Config(ConfigCommand),
}

/// A row of a listing, as printed by `search` or `list`.
#[derive(clap::Args, Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// Row number, starting at 1
    #[arg(value_name = "POSITION", value_parser = clap::value_parser!(u64).range(1..))]
    pub position: u64,

    /// Pick from the results of this search instead of the full list
    #[arg(short, long, value_name = "TERM")]
    pub term: Option<String>,
}

impl Selection {
    /// Zero-based position in the listing.
    pub fn index(&self) -> usize {
        (self.position - 1) as usize
    }
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ConfigCommand {
    /// Print the value of a setting
    Get {
        #[arg(value_name = "NAME")]
        name: String,
    },
    /// Change a setting and save the configuration (an empty value unsets it)
    Set {
        #[arg(value_name = "NAME")]
        name: String,
        #[arg(value_name = "VALUE")]
        value: String,
    },
    /// Print every setting
    Show,
}
