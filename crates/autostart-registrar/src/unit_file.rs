//! Structured systemd unit files.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

/// Ordered `[Section]` / `Key=Value` document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnitFile {
    sections: Vec<(String, Vec<(String, String)>)>,
}

impl UnitFile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new section; following `set` calls add to it.
    pub fn section(mut self, name: &str) -> Self {
        self.sections.push((name.to_string(), Vec::new()));
        self
    }

    pub fn set(mut self, key: &str, value: impl Into<String>) -> Self {
        if self.sections.is_empty() {
            self.sections.push(("Unit".to_string(), Vec::new()));
        }
        if let Some((_, entries)) = self.sections.last_mut() {
            let value: String = value.into();
            // Newlines would start a new key.
            entries.push((key.to_string(), value.replace(['\n', '\r'], " ")));
        }
        self
    }

    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.sections
            .iter()
            .filter(|(name, _)| name == section)
            .flat_map(|(_, entries)| entries.iter())
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for (idx, (name, entries)) in self.sections.iter().enumerate() {
            if idx > 0 {
                out.push('\n');
            }
            let _ = writeln!(out, "[{name}]");
            for (key, value) in entries {
                let _ = writeln!(out, "{key}={value}");
            }
        }
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestartPolicy {
    pub delay_secs: u64,
}

/// The service-manager autostart variant for one project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceUnit {
    /// Unit name without `.service`.
    pub name: String,
    pub description: String,
    pub working_dir: PathBuf,
    /// Program and arguments for `ExecStart`.
    pub exec_start: Vec<String>,
    pub restart: RestartPolicy,
    pub stdout_log: PathBuf,
    pub stderr_log: PathBuf,
    /// Account the bot runs as. `None` runs as root.
    pub user: Option<String>,
}

impl ServiceUnit {
    pub fn file_name(&self) -> String {
        format!("{}.service", self.name)
    }

    pub fn path_in(&self, unit_dir: &Path) -> PathBuf {
        unit_dir.join(self.file_name())
    }

    pub fn to_unit_file(&self) -> UnitFile {
        let exec_start = self
            .exec_start
            .iter()
            .map(|arg| systemd_quote(arg))
            .collect::<Vec<_>>()
            .join(" ");

        let mut unit = UnitFile::new()
            .section("Unit")
            .set("Description", self.description.as_str())
            .set("After", "network-online.target")
            .set("Wants", "network-online.target")
            .section("Service")
            .set("Type", "simple");

        if let Some(user) = &self.user {
            unit = unit.set("User", user.as_str());
        }

        unit.set("WorkingDirectory", self.working_dir.to_string_lossy())
            .set("ExecStart", exec_start)
            .set("Restart", "always")
            .set("RestartSec", self.restart.delay_secs.to_string())
            .set("StandardOutput", format!("append:{}", self.stdout_log.display()))
            .set("StandardError", format!("append:{}", self.stderr_log.display()))
            .section("Install")
            .set("WantedBy", "multi-user.target")
    }
}

/// Quote one `ExecStart` word. `%` is the specifier prefix in unit files.
fn systemd_quote(word: &str) -> String {
    let escaped = word.replace('%', "%%");
    let needs_quotes = escaped.is_empty()
        || escaped
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '"' | '\'' | '\\' | ';' | '$'));

    if needs_quotes {
        let inner = escaped
            .replace('\\', "\\\\")
            .replace('"', "\\\"")
            .replace('$', "$$");
        format!("\"{inner}\"")
    } else {
        escaped
    }
}
