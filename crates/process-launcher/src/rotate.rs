//! Size-based log rotation, `bot.log` -> `bot.log.1` -> ... -> `bot.log.N`.

use std::io;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotationPolicy {
    /// Rotate when the file is larger than this.
    pub max_bytes: u64,
    /// Generations kept. Zero truncates instead of keeping any.
    pub backups: u32,
}

impl Default for RotationPolicy {
    fn default() -> Self {
        Self {
            max_bytes: 10 * 1024 * 1024,
            backups: 5,
        }
    }
}

/// Rotate `path` if it exceeds the policy. Returns whether it was rotated.
pub fn rotate_if_needed(path: &Path, policy: RotationPolicy) -> io::Result<bool> {
    let size = match std::fs::metadata(path) {
        Ok(meta) => meta.len(),
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e),
    };

    if size <= policy.max_bytes {
        return Ok(false);
    }

    if policy.backups == 0 {
        std::fs::remove_file(path)?;
    } else {
        let oldest = backup_path(path, policy.backups);
        if oldest.exists() {
            std::fs::remove_file(&oldest)?;
        }
        for generation in (1..policy.backups).rev() {
            let from = backup_path(path, generation);
            if from.exists() {
                std::fs::rename(&from, backup_path(path, generation + 1))?;
            }
        }
        std::fs::rename(path, backup_path(path, 1))?;
    }

    info!(path = %path.display(), size, backups = policy.backups, "rotated log");
    Ok(true)
}

fn backup_path(path: &Path, generation: u32) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(format!(".{generation}"));
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn policy(max_bytes: u64, backups: u32) -> RotationPolicy {
        RotationPolicy { max_bytes, backups }
    }

    #[test]
    fn small_or_missing_files_are_left_alone() {
        let dir = tempdir().unwrap();
        let log = dir.path().join("bot.log");
        assert!(!rotate_if_needed(&log, policy(10, 3)).unwrap());

        std::fs::write(&log, "0123456789").unwrap();
        assert!(!rotate_if_needed(&log, policy(10, 3)).unwrap());
        assert!(log.exists());
    }

    #[test]
    fn shifts_generations_and_drops_the_oldest() {
        let dir = tempdir().unwrap();
        let log = dir.path().join("bot.log");

        for round in ["first", "second", "third", "fourth"] {
            std::fs::write(&log, format!("{round} generation, long enough")).unwrap();
            assert!(rotate_if_needed(&log, policy(8, 3)).unwrap());
        }

        assert!(!log.exists());
        let read = |n: u32| std::fs::read_to_string(backup_path(&log, n)).unwrap();
        assert!(read(1).starts_with("fourth"));
        assert!(read(2).starts_with("third"));
        assert!(read(3).starts_with("second"));
        assert!(!backup_path(&log, 4).exists());
    }

    #[test]
    fn zero_backups_discards_the_log() {
        let dir = tempdir().unwrap();
        let log = dir.path().join("bot_error.log");
        std::fs::write(&log, "a long error log line").unwrap();
        assert!(rotate_if_needed(&log, policy(4, 0)).unwrap());
        assert!(!log.exists());
        assert!(!backup_path(&log, 1).exists());
    }
}
