//! PID file helpers and the PID-file registry.

use crate::registry::{cmd_refresh, command_line_matches};
use crate::{GuardError, GuardResult, ProcessRegistry};
use std::path::{Path, PathBuf};
use sysinfo::{Pid, ProcessStatus, System};
use tracing::{debug, warn};

/// Write `pid` to the given path, creating the parent directory.
pub fn write_pid_file(pid_path: &Path, pid: u32) -> GuardResult<()> {
    if let Some(parent) = pid_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(pid_path, pid.to_string())?;
    Ok(())
}

/// Read a PID from the given file.
pub fn read_pid_file(pid_path: &Path) -> GuardResult<Option<u32>> {
    if !pid_path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(pid_path)?;
    let pid = content
        .trim()
        .parse::<u32>()
        .map_err(|e| GuardError::PidFile(format!("Invalid PID in {}: {}", pid_path.display(), e)))?;
    Ok(Some(pid))
}

/// Clean up PID file if it exists.
pub fn cleanup_pid_file(pid_path: &Path) -> GuardResult<()> {
    if pid_path.exists() {
        std::fs::remove_file(pid_path)?;
    }
    Ok(())
}

/// Tracks the bot through a PID file written at launch.
///
/// A recorded PID only counts as running while that process is alive and its
/// command line still matches the pattern, so a recycled PID is not mistaken
/// for the bot.
#[derive(Debug, Clone)]
pub struct PidFileRegistry {
    pid_path: PathBuf,
}

impl PidFileRegistry {
    pub fn new(pid_path: PathBuf) -> Self {
        Self { pid_path }
    }

    pub fn pid_path(&self) -> &Path {
        &self.pid_path
    }
}

impl ProcessRegistry for PidFileRegistry {
    fn running_pids(&self, pattern: &str) -> GuardResult<Vec<u32>> {
        let pid = match read_pid_file(&self.pid_path) {
            Ok(Some(pid)) => pid,
            Ok(None) => return Ok(Vec::new()),
            Err(GuardError::PidFile(msg)) => {
                warn!(error = %msg, "removing unreadable PID file");
                cleanup_pid_file(&self.pid_path)?;
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };

        let sys_pid = Pid::from_u32(pid);
        let mut system = System::new();
        let alive = system.refresh_process_specifics(sys_pid, cmd_refresh())
            && system.process(sys_pid).is_some_and(|p| {
                p.status() != ProcessStatus::Zombie && command_line_matches(p.cmd(), pattern)
            });

        if alive {
            Ok(vec![pid])
        } else {
            debug!(pid, path = %self.pid_path.display(), "removing stale PID file");
            cleanup_pid_file(&self.pid_path)?;
            Ok(Vec::new())
        }
    }

    fn record_start(&self, pid: u32) -> GuardResult<()> {
        write_pid_file(&self.pid_path, pid)
    }

    fn record_stop(&self, pid: u32) -> GuardResult<()> {
        match read_pid_file(&self.pid_path) {
            Ok(Some(recorded)) if recorded == pid => cleanup_pid_file(&self.pid_path),
            Ok(_) => Ok(()),
            Err(GuardError::PidFile(_)) => cleanup_pid_file(&self.pid_path),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::{Command, Stdio};
    use tempfile::TempDir;

    fn tmp() -> TempDir {
        tempfile::tempdir().unwrap()
    }

    #[test]
    fn write_and_read_pid_file() {
        let dir = tmp();
        let pid_path = dir.path().join("data").join("bot.pid");
        write_pid_file(&pid_path, 4242).unwrap();
        assert_eq!(read_pid_file(&pid_path).unwrap(), Some(4242));
    }

    #[test]
    fn read_pid_file_missing_returns_none() {
        let dir = tmp();
        assert_eq!(read_pid_file(&dir.path().join("bot.pid")).unwrap(), None);
    }

    #[test]
    fn read_pid_file_invalid_content() {
        let dir = tmp();
        let pid_path = dir.path().join("bot.pid");
        std::fs::write(&pid_path, "not-a-number").unwrap();
        assert!(matches!(read_pid_file(&pid_path), Err(GuardError::PidFile(_))));
    }

    #[test]
    fn cleanup_pid_file_is_idempotent() {
        let dir = tmp();
        let pid_path = dir.path().join("bot.pid");
        std::fs::write(&pid_path, "1").unwrap();
        cleanup_pid_file(&pid_path).unwrap();
        cleanup_pid_file(&pid_path).unwrap();
        assert!(!pid_path.exists());
    }

    #[test]
    fn stale_pid_is_not_running_and_file_is_removed() {
        let dir = tmp();
        let pid_path = dir.path().join("bot.pid");
        let registry = PidFileRegistry::new(pid_path.clone());

        // Our own PID is alive but its command line is the test binary.
        registry.record_start(std::process::id()).unwrap();
        assert!(!registry.is_running("bot.py").unwrap());
        assert!(!pid_path.exists());
    }

    #[test]
    fn recorded_live_process_is_running_until_stopped() {
        let dir = tmp();
        let registry = PidFileRegistry::new(dir.path().join("bot.pid"));
        let marker = format!("{}.5", 50_000 + std::process::id() % 10_000);
        let pattern = format!("sleep {marker}");

        let mut child = Command::new("sleep")
            .arg(&marker)
            .stdout(Stdio::null())
            .spawn()
            .unwrap();

        assert!(!registry.is_running(&pattern).unwrap());
        registry.record_start(child.id()).unwrap();
        assert_eq!(registry.running_pids(&pattern).unwrap(), vec![child.id()]);

        registry.record_stop(child.id() + 1).unwrap();
        assert!(registry.pid_path().exists(), "a different pid must not clear the record");

        child.kill().unwrap();
        child.wait().unwrap();
        registry.record_stop(child.id()).unwrap();
        assert!(!registry.pid_path().exists());
        assert!(!registry.is_running(&pattern).unwrap());
    }

    #[test]
    fn pid_written_for_a_live_child_is_reported() {
        let dir = tmp();
        let pid_path = dir.path().join("bot.pid");
        let marker = format!("{}.75", 52_000 + std::process::id() % 10_000);

        let mut child = Command::new("sleep")
            .arg(&marker)
            .stdout(Stdio::null())
            .spawn()
            .unwrap();
        write_pid_file(&pid_path, child.id()).unwrap();

        let registry = PidFileRegistry::new(pid_path.clone());
        let pids = registry.running_pids(&format!("sleep {marker}")).unwrap();

        child.kill().unwrap();
        child.wait().unwrap();
        assert_eq!(pids, vec![child.id()]);
        assert!(pid_path.exists());
    }

    #[test]
    fn garbage_pid_file_is_discarded() {
        let dir = tmp();
        let pid_path = dir.path().join("bot.pid");
        std::fs::write(&pid_path, "garbage").unwrap();
        let registry = PidFileRegistry::new(pid_path.clone());
        assert!(!registry.is_running("bot.py").unwrap());
        assert!(!pid_path.exists());
    }
}
