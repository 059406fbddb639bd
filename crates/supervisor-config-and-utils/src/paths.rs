//! File system paths for a supervised bot project.
//!
//! Everything lives under the project directory so the service unit, the boot
//! scheduler and manual invocations all agree on where state and logs are.

use crate::{CoreError, CoreResult};
use std::path::{Path, PathBuf};

const DATA_DIR: &str = "data";
const LOGS_DIR: &str = "logs";

/// Manages file system paths for one bot project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    /// Absolute project directory (working directory of the bot)
    project_dir: PathBuf,
}

impl Paths {
    /// Create a Paths instance rooted at `project_dir`.
    ///
    /// Relative roots are kept as given; use [`Paths::resolve`] for CLI input.
    pub fn new(project_dir: PathBuf) -> Self {
        Self { project_dir }
    }

    /// Build Paths from an optional CLI argument, defaulting to the current
    /// directory and always producing an absolute root.
    pub fn resolve(project_dir: Option<&Path>) -> CoreResult<Self> {
        let cwd = std::env::current_dir()
            .map_err(|e| CoreError::Path(format!("Could not determine current directory: {e}")))?;

        let root = match project_dir {
            Some(dir) if dir.is_absolute() => dir.to_path_buf(),
            Some(dir) => cwd.join(dir),
            None => cwd,
        };

        Ok(Self::new(root))
    }

    /// The project directory.
    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    /// Make a possibly relative path absolute against the project directory.
    pub fn absolutize(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_dir.join(path)
        }
    }

    /// Bot configuration source (`<project>/.env`).
    pub fn env_file(&self) -> PathBuf {
        self.project_dir.join(".env")
    }

    /// Runtime state directory (`<project>/data`).
    pub fn data_dir(&self) -> PathBuf {
        self.project_dir.join(DATA_DIR)
    }

    /// Log directory (`<project>/logs`).
    pub fn logs_dir(&self) -> PathBuf {
        self.project_dir.join(LOGS_DIR)
    }

    /// Supervisor configuration (`data/supervisor.json`).
    pub fn config_file(&self) -> PathBuf {
        self.data_dir().join("supervisor.json")
    }

    /// Persisted state record (`data/state.json`).
    pub fn state_file(&self) -> PathBuf {
        self.data_dir().join("state.json")
    }

    /// Advisory lock serializing guard-check-and-launch (`data/supervisor.lock`).
    pub fn lock_file(&self) -> PathBuf {
        self.data_dir().join("supervisor.lock")
    }

    /// PID file used by the pid-file registry (`data/bot.pid`).
    pub fn pid_file(&self) -> PathBuf {
        self.data_dir().join("bot.pid")
    }

    /// Wrapper script invoked by the boot-time scheduler entry.
    pub fn cron_wrapper_script(&self) -> PathBuf {
        self.data_dir().join("autostart-cron.sh")
    }

    /// Supervisor structured log (`logs/supervisor.jsonl`).
    pub fn supervisor_log(&self) -> PathBuf {
        self.logs_dir().join("supervisor.jsonl")
    }

    /// Bot stdout when started manually or by the service manager.
    pub fn bot_log(&self) -> PathBuf {
        self.logs_dir().join("bot.log")
    }

    /// Bot stderr when started manually or by the service manager.
    pub fn bot_error_log(&self) -> PathBuf {
        self.logs_dir().join("bot_error.log")
    }

    /// Bot stdout when started by the boot scheduler.
    pub fn cron_bot_log(&self) -> PathBuf {
        self.logs_dir().join("cron_bot.log")
    }

    /// Bot stderr when started by the boot scheduler.
    pub fn cron_bot_error_log(&self) -> PathBuf {
        self.logs_dir().join("cron_bot_error.log")
    }

    /// Filtered terminal transcript for a session (`logs/<session>_terminal.log`).
    pub fn terminal_log(&self, session: &str) -> PathBuf {
        let file_safe: String = session
            .chars()
            .map(|c| if c == '/' || c == '\0' { '_' } else { c })
            .collect();
        self.logs_dir().join(format!("{file_safe}_terminal.log"))
    }

    /// Ensure all required directories exist.
    pub fn ensure_dirs(&self) -> CoreResult<()> {
        std::fs::create_dir_all(self.data_dir())?;
        std::fs::create_dir_all(self.logs_dir())?;
        Ok(())
    }
}
