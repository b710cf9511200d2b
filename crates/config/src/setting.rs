use crate::error::{Error, ErrorKind};
use derive_more::Display;
use std::str::FromStr;

/// A recognized configuration key.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Setting {
    /// Library root directory.
    #[display("dir")]
    Dir,
    /// Store file path.
    #[display("dbfile")]
    DbFile,
    #[display("pdfcmd")]
    PdfCmd,
    #[display("chmcmd")]
    ChmCmd,
    /// Reveal-in-file-manager command.
    #[display("showcmd")]
    ShowCmd,
}
impl Setting {
    /// Every setting, in the order they are written to disk.
    pub const ALL: [Setting; 5] = [Self::Dir, Self::DbFile, Self::PdfCmd, Self::ChmCmd, Self::ShowCmd];

    pub fn key(&self) -> &'static str {
        match self {
            Self::Dir => "dir",
            Self::DbFile => "dbfile",
            Self::PdfCmd => "pdfcmd",
            Self::ChmCmd => "chmcmd",
            Self::ShowCmd => "showcmd",
        }
    }

    /// The opener command setting for a file type (`pdf` → `pdfcmd`).
    pub fn opener(file_type: &str) -> Option<Self> {
        match file_type {
            "pdf" => Some(Self::PdfCmd),
            "chm" => Some(Self::ChmCmd),
            _ => None,
        }
    }
}
impl FromStr for Setting {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|setting| setting.key() == s)
            .ok_or_else(|| Error::from(ErrorKind::UnknownSetting(s.to_string())))
    }
}
