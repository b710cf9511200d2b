use std::path::Path;

/// Document formats that are eligible for library membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    Pdf,
    Chm,
}
impl Format {
    /// Every format, in the order extensions are listed to users.
    pub const ALL: [Format; 2] = [Format::Pdf, Format::Chm];

    /// Lowercase extension (without the dot) for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Chm => "chm",
        }
    }

    /// Classify an already-lowercased extension.
    pub fn from_extension(extension: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|format| format.extension() == extension)
    }

    /// Classify a file by its name alone; the file is never opened.
    ///
    /// Hidden files (names starting with `.`) are never classified, regardless
    /// of their extension.
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        let filename = path.as_ref().file_name()?.to_str()?;
        if is_hidden(filename) {
            return None;
        }
        Self::from_extension(&file_type(filename))
    }
}

/// The lowercase text after the last `.` of a file name, or an empty string
/// if the name has no `.` at all.
pub fn file_type(filename: &str) -> String {
    filename.rsplit_once('.').map(|(_, ext)| ext.to_lowercase()).unwrap_or_default()
}

/// Dotfiles are skipped entirely by library scans.
pub fn is_hidden(filename: &str) -> bool {
    filename.starts_with('.')
}

/// A qualifying file is a non-hidden file with a `.pdf` or `.chm` extension
/// (case-insensitive).
pub fn is_qualifying(path: impl AsRef<Path>) -> bool {
    Format::from_path(path).is_some()
}
