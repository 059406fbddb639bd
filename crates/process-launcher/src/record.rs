use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A launched bot process. Valid until the process exits; liveness is
/// always re-checked through the instance guard, never through this record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessRecord {
    pub pid: u32,
    pub started_at: DateTime<Utc>,
    pub command: Vec<String>,
    pub stdout_log: PathBuf,
    pub stderr_log: PathBuf,
}

impl ProcessRecord {
    /// Human-readable command line.
    pub fn command_line(&self) -> String {
        self.command.join(" ")
    }
}
