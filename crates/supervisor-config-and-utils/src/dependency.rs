//! External tool checks.

use crate::find_in_path;
use std::path::PathBuf;
use tracing::debug;

/// Result of looking up one external program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyInfo {
    pub name: String,
    pub installed: bool,
    pub path: Option<PathBuf>,
}

impl DependencyInfo {
    /// Remediation shown when the program is missing.
    pub fn install_hint(&self) -> String {
        install_hint(&self.name)
    }
}

/// Check whether `name` is available on `PATH`.
pub fn check_dependency(name: &str) -> DependencyInfo {
    let path = find_in_path(name);
    debug!(dependency = name, installed = path.is_some(), path = ?path, "checked dependency");

    DependencyInfo {
        name: name.to_string(),
        installed: path.is_some(),
        path,
    }
}

/// Suggested installation command for a known tool.
pub fn install_hint(name: &str) -> String {
    match name {
        "tmux" => "install tmux (e.g. `sudo apt install tmux`)".to_string(),
        "crontab" => "install cron (e.g. `sudo apt install cron`)".to_string(),
        "systemctl" => {
            "systemd is not available on this host; use the cron autostart variant instead"
                .to_string()
        }
        name if name.starts_with("python") => {
            format!("install {name} (e.g. `sudo apt install python3`) or set `interpreter` in data/supervisor.json")
        }
        other => format!("install `{other}` and make sure it is on PATH"),
    }
}
