//! Handing files over to external programs.

use crate::error::{ErrorKind, Result};
use exn::{OptionExt, ResultExt};
use std::path::Path;
use std::process::{Command, Stdio};

/// Outcome of asking a [`Launcher`] to start a program.
///
/// A failed launch is reported, not raised: nothing about the library is
/// wrong when a viewer is missing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Launch {
    Started,
    Failed { reason: String },
}

/// Starts an external program on a file or directory.
pub trait Launcher {
    /// Run `command` (shell words) with `target` appended as the final
    /// argument. Must not wait for the program to finish.
    fn launch(&self, command: &str, target: &Path) -> Result<()>;
}

/// [`Launcher`] that spawns a detached child process with all standard
/// streams discarded.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessLauncher;

impl ProcessLauncher {
    /// Split a command into its program and arguments, POSIX shell style.
    fn split(command: &str) -> Result<(String, Vec<String>)> {
        let mut words = shlex::split(command)
            .ok_or_raise(|| ErrorKind::Launch(format!("cannot parse command `{command}`")))?
            .into_iter();
        let program = words.next().ok_or_raise(|| ErrorKind::Launch("empty command".to_string()))?;
        Ok((program, words.collect()))
    }
}

impl Launcher for ProcessLauncher {
    fn launch(&self, command: &str, target: &Path) -> Result<()> {
        let (program, args) = Self::split(command)?;
        let executable =
            which::which(&program).or_raise(|| ErrorKind::Launch(format!("`{program}` not found on PATH")))?;
        tracing::debug!(program = %executable.display(), ?args, target = %target.display(), "Launching");
        // The child is never waited on; it outlives us if need be.
        Command::new(executable)
            .args(args)
            .arg(target)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .or_raise(|| ErrorKind::Launch(format!("`{program}` could not be started")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("xdg-open", "xdg-open", &[])]
    #[case("open -R", "open", &["-R"])]
    #[case("evince --page-label=1", "evince", &["--page-label=1"])]
    #[case("'/Applications/My Viewer' --new", "/Applications/My Viewer", &["--new"])]
    fn test_split(#[case] command: &str, #[case] program: &str, #[case] args: &[&str]) {
        let (parsed_program, parsed_args) = ProcessLauncher::split(command).unwrap();
        assert_eq!(parsed_program, program);
        assert_eq!(parsed_args, args);
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("viewer 'unterminated")]
    fn test_split_rejects(#[case] command: &str) {
        let err = ProcessLauncher::split(command).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Launch(_)));
    }

    #[test]
    fn test_missing_program() {
        let err = ProcessLauncher.launch("libris-no-such-viewer-exists", Path::new("/tmp/book.pdf")).unwrap_err();
        assert_eq!(*err, ErrorKind::Launch("`libris-no-such-viewer-exists` not found on PATH".to_string()));
    }

    #[cfg(unix)]
    #[test]
    fn test_spawns_without_waiting() {
        // `true` ignores its arguments and exits immediately.
        ProcessLauncher.launch("true --ignored", Path::new("/tmp/book.pdf")).unwrap();
    }
}
