//! `@reboot` crontab variant.

use crate::{AutostartError, AutostartResult};
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use supervisor_config_and_utils::shell_escape;
use tracing::debug;

/// Lifecycle of the scheduler variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    NotRegistered,
    Registered,
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotRegistered => write!(f, "not registered"),
            Self::Registered => write!(f, "registered"),
        }
    }
}

/// Access to the invoking user's crontab.
pub trait CrontabStore {
    fn is_available(&self) -> bool;
    /// Current crontab; empty when the user has none.
    fn read(&self) -> AutostartResult<String>;
    fn write(&self, content: &str) -> AutostartResult<()>;
}

/// The `crontab` command.
#[derive(Debug, Clone)]
pub struct SystemCrontab {
    program: String,
}

impl Default for SystemCrontab {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemCrontab {
    pub fn new() -> Self {
        Self {
            program: "crontab".to_string(),
        }
    }

    fn command(&self) -> Command {
        Command::new(&self.program)
    }

    fn map_spawn_error(&self, err: std::io::Error) -> AutostartError {
        if err.kind() == std::io::ErrorKind::NotFound {
            AutostartError::MissingDependency {
                program: self.program.clone(),
            }
        } else {
            AutostartError::Io(err)
        }
    }
}

impl CrontabStore for SystemCrontab {
    fn is_available(&self) -> bool {
        supervisor_config_and_utils::find_in_path(&self.program).is_some()
    }

    fn read(&self) -> AutostartResult<String> {
        let output = self
            .command()
            .arg("-l")
            .stdin(Stdio::null())
            .output()
            .map_err(|e| self.map_spawn_error(e))?;

        if output.status.success() {
            return Ok(String::from_utf8_lossy(&output.stdout).into_owned());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        if stderr.to_ascii_lowercase().contains("no crontab") {
            return Ok(String::new());
        }
        Err(AutostartError::CommandFailed {
            command: format!("{} -l", self.program),
            detail: stderr.trim().to_string(),
        })
    }

    fn write(&self, content: &str) -> AutostartResult<()> {
        let mut child = self
            .command()
            .arg("-")
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.map_spawn_error(e))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(content.as_bytes())?;
        }

        let output = child.wait_with_output()?;
        if output.status.success() {
            Ok(())
        } else {
            Err(AutostartError::CommandFailed {
                command: format!("{} -", self.program),
                detail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }
}

/// Shell script cron runs at boot. Cron starts with a minimal environment,
/// so the script restores `PATH`, enters the project and runs the launcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrapperScript {
    pub project_dir: PathBuf,
    pub supervisor_exe: PathBuf,
    pub stdout_log: PathBuf,
    pub stderr_log: PathBuf,
    pub path_env: Option<String>,
}

impl WrapperScript {
    pub fn render(&self) -> String {
        let project = self.project_dir.to_string_lossy();
        let stderr_log = shell_escape(&self.stderr_log.to_string_lossy());

        let mut script = String::from("#!/bin/sh\n");
        script.push_str(&format!("# Boot-time start of the bot supervisor for {project}\n"));
        if let Some(path) = &self.path_env {
            script.push_str(&format!("PATH={}\nexport PATH\n", shell_escape(path)));
        }
        script.push_str(&format!("cd {} || exit 1\n", shell_escape(&project)));
        script.push_str(&format!(
            "exec {} --project-dir {} launch --stdout-log {} --stderr-log {} >> {} 2>&1\n",
            shell_escape(&self.supervisor_exe.to_string_lossy()),
            shell_escape(&project),
            shell_escape(&self.stdout_log.to_string_lossy()),
            stderr_log,
            stderr_log,
        ));
        script
    }

    /// Write the script with mode 0755.
    pub fn write_to(&self, path: &Path) -> AutostartResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.render())?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))?;
        }
        Ok(())
    }
}

/// The scheduler autostart variant for one project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledJob {
    pub script_path: PathBuf,
    pub script: WrapperScript,
}

impl ScheduledJob {
    /// The crontab line, `@reboot <script>`.
    pub fn entry_line(&self) -> String {
        let path = self.script_path.to_string_lossy();
        if path.chars().any(|c| c.is_whitespace() || "'\"\\$`;&|<>()%".contains(c)) {
            format!("@reboot {}", shell_escape(&path).replace('%', "\\%"))
        } else {
            format!("@reboot {path}")
        }
    }

    pub fn is_registered_in(&self, crontab: &str) -> bool {
        let entry = self.entry_line();
        crontab.lines().any(|line| line.trim() == entry)
    }

    /// `crontab` with the entry appended, or `None` if already present.
    pub fn with_entry(&self, crontab: &str) -> Option<String> {
        if self.is_registered_in(crontab) {
            return None;
        }
        let mut updated = crontab.to_string();
        if !updated.is_empty() && !updated.ends_with('\n') {
            updated.push('\n');
        }
        updated.push_str(&self.entry_line());
        updated.push('\n');
        Some(updated)
    }

    /// `crontab` without the entry, or `None` if it was absent.
    pub fn without_entry(&self, crontab: &str) -> Option<String> {
        if !self.is_registered_in(crontab) {
            return None;
        }
        let entry = self.entry_line();
        let kept: Vec<&str> = crontab.lines().filter(|line| line.trim() != entry).collect();
        let mut updated = kept.join("\n");
        if !updated.is_empty() {
            updated.push('\n');
        }
        debug!(removed = %entry, "crontab entry removed");
        Some(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn job(script_path: &str) -> ScheduledJob {
        ScheduledJob {
            script_path: script_path.into(),
            script: WrapperScript {
                project_dir: "/srv/bot".into(),
                supervisor_exe: "/usr/local/bin/bot-supervisor".into(),
                stdout_log: "/srv/bot/logs/cron_bot.log".into(),
                stderr_log: "/srv/bot/logs/cron_bot_error.log".into(),
                path_env: Some("/usr/local/bin:/usr/bin:/bin".into()),
            },
        }
    }

    #[test]
    fn entry_line_is_reboot_trigger() {
        assert_eq!(
            job("/srv/bot/data/autostart-cron.sh").entry_line(),
            "@reboot /srv/bot/data/autostart-cron.sh"
        );
        assert_eq!(
            job("/srv/my bot/data/autostart-cron.sh").entry_line(),
            "@reboot '/srv/my bot/data/autostart-cron.sh'"
        );
    }

    #[test]
    fn adding_twice_keeps_one_line() {
        let job = job("/srv/bot/data/autostart-cron.sh");
        let existing = "MAILTO=\"\"\n0 * * * * /usr/bin/backup";

        let once = job.with_entry(existing).unwrap();
        assert!(job.with_entry(&once).is_none());
        assert_eq!(
            once,
            "MAILTO=\"\"\n0 * * * * /usr/bin/backup\n@reboot /srv/bot/data/autostart-cron.sh\n"
        );
    }

    #[test]
    fn other_projects_do_not_count_as_registered() {
        let job = job("/srv/bot/data/autostart-cron.sh");
        assert!(!job.is_registered_in("@reboot /srv/bot2/data/autostart-cron.sh\n"));
        assert!(job.is_registered_in("  @reboot /srv/bot/data/autostart-cron.sh  \n"));
    }

    #[test]
    fn removal_keeps_unrelated_lines() {
        let job = job("/srv/bot/data/autostart-cron.sh");
        let crontab = "0 * * * * /usr/bin/backup\n@reboot /srv/bot/data/autostart-cron.sh\n";
        assert_eq!(job.without_entry(crontab).unwrap(), "0 * * * * /usr/bin/backup\n");
        assert!(job.without_entry("0 * * * * /usr/bin/backup\n").is_none());
        assert_eq!(
            job.without_entry("@reboot /srv/bot/data/autostart-cron.sh\n").unwrap(),
            ""
        );
    }

    #[test]
    fn wrapper_script_runs_launch_with_cron_logs() {
        let script = job("/srv/bot/data/autostart-cron.sh").script.render();
        assert!(script.starts_with("#!/bin/sh\n"));
        assert!(script.contains("PATH='/usr/local/bin:/usr/bin:/bin'\nexport PATH\n"));
        assert!(script.contains("cd '/srv/bot' || exit 1\n"));
        assert!(script.contains(
            "exec '/usr/local/bin/bot-supervisor' --project-dir '/srv/bot' launch \
             --stdout-log '/srv/bot/logs/cron_bot.log' --stderr-log '/srv/bot/logs/cron_bot_error.log' \
             >> '/srv/bot/logs/cron_bot_error.log' 2>&1\n"
        ));
    }

    #[test]
    fn wrapper_script_is_executable() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data").join("autostart-cron.sh");
        job("/x").script.write_to(&path).unwrap();

        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }

    #[test]
    fn job_state_display() {
        assert_eq!(JobState::Registered.to_string(), "registered");
    }
}
