//! The command tmux runs for a capture pipe.

use std::path::{Path, PathBuf};
use supervisor_config_and_utils::shell_escape;

/// A program plus arguments, rendered into one shell-safe string for
/// `tmux pipe-pane`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl CaptureCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// The supervisor's own `filter` subcommand appending to `log_path`.
    pub fn filter(supervisor_exe: &Path, project_dir: &Path, log_path: &Path) -> Self {
        Self::new(supervisor_exe)
            .arg("--project-dir")
            .arg(project_dir.to_string_lossy())
            .arg("filter")
            .arg("--output")
            .arg(log_path.to_string_lossy())
    }

    /// Shell form with every word single-quoted.
    pub fn render(&self) -> String {
        std::iter::once(self.program.to_string_lossy().into_owned())
            .chain(self.args.iter().cloned())
            .map(|word| shell_escape(&word))
            .collect::<Vec<_>>()
            .join(" ")
    }
}
