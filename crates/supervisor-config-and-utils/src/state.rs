//! Persisted supervisor state (`data/state.json`).
//!
//! The file is advisory: unreadable or malformed state is treated as absent
//! and overwritten on the next successful save.

use crate::CoreResult;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Details of the most recent successful launch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastLaunch {
    pub pid: u32,
    pub started_at: String,
    pub command: Vec<String>,
    pub stdout_log: PathBuf,
    pub stderr_log: PathBuf,
}

/// State persisted between supervisor invocations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateRecord {
    /// Last terminal session the supervisor ensured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tmux_session: Option<String>,
    /// RFC 3339 timestamp of the last write. Kept as a string so hand-edited
    /// files with other formats still load.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_launch: Option<LastLaunch>,
}

impl StateRecord {
    /// Load state, treating a missing or unreadable file as empty.
    pub fn load(path: &Path) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Self::default(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "could not read state file");
                return Self::default();
            }
        };

        serde_json::from_str(&content).unwrap_or_else(|e| {
            tracing::warn!(path = %path.display(), error = %e, "ignoring malformed state file");
            Self::default()
        })
    }

    /// Session name stored in the state, if non-empty.
    pub fn session(&self) -> Option<&str> {
        self.tmux_session
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    pub fn set_session(&mut self, name: &str) {
        self.tmux_session = Some(name.to_string());
    }

    pub fn set_last_launch(&mut self, launch: LastLaunch) {
        self.last_launch = Some(launch);
    }

    /// Stamp `updated_at` and write atomically through a sibling temp file.
    pub fn save(&mut self, path: &Path) -> CoreResult<()> {
        self.updated_at = Some(Utc::now().to_rfc3339());

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_string_pretty(self)?)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_is_empty_state() {
        let dir = tempdir().unwrap();
        let state = StateRecord::load(&dir.path().join("state.json"));
        assert_eq!(state, StateRecord::default());
        assert_eq!(state.session(), None);
    }

    #[test]
    fn malformed_file_is_empty_state() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{not json").unwrap();
        assert_eq!(StateRecord::load(&path), StateRecord::default());
    }

    #[test]
    fn reads_legacy_format() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(
            &path,
            r#"{"tmux_session": "saved", "updated_at": "2025-03-01T12:00:00.123456"}"#,
        )
        .unwrap();

        let state = StateRecord::load(&path);
        assert_eq!(state.session(), Some("saved"));
        assert!(state.last_launch.is_none());
    }

    #[test]
    fn save_then_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data").join("state.json");

        let mut state = StateRecord::default();
        state.set_session("work");
        state.set_last_launch(LastLaunch {
            pid: 4242,
            started_at: "2026-01-01T00:00:00Z".into(),
            command: vec!["python3".into(), "bot.py".into()],
            stdout_log: PathBuf::from("logs/bot.log"),
            stderr_log: PathBuf::from("logs/bot_error.log"),
        });
        state.save(&path).unwrap();

        let loaded = StateRecord::load(&path);
        assert_eq!(loaded.session(), Some("work"));
        assert!(loaded.updated_at.is_some());
        assert_eq!(loaded.last_launch.map(|l| l.pid), Some(4242));
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn blank_session_is_ignored() {
        let state = StateRecord {
            tmux_session: Some("   ".into()),
            ..Default::default()
        };
        assert_eq!(state.session(), None);
    }
}
