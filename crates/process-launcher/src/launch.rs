//! Spawning the bot.

use crate::{rotate_if_needed, LaunchError, LaunchResult, ProcessRecord, RotationPolicy};
use chrono::Utc;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use supervisor_config_and_utils::{find_in_path, BotEnv, CoreError};
use tracing::{info, warn};

/// How the launched process relates to the supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchMode {
    /// New session, detached from the invoking shell; the supervisor returns.
    Detached,
    /// Same process group; the caller waits on the child.
    Foreground,
}

/// Everything needed to start the bot.
#[derive(Debug, Clone)]
pub struct LaunchSpec {
    pub interpreter: String,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
    pub stdout_log: PathBuf,
    pub stderr_log: PathBuf,
    pub rotation: RotationPolicy,
    pub mode: LaunchMode,
}

impl LaunchSpec {
    pub fn command(&self) -> Vec<String> {
        std::iter::once(self.interpreter.clone())
            .chain(self.args.iter().cloned())
            .collect()
    }
}

/// A started bot: its record plus the child handle for foreground waits.
#[derive(Debug)]
pub struct LaunchedProcess {
    pub record: ProcessRecord,
    pub child: Child,
}

/// Start the bot described by `spec` with environment `env`.
///
/// Fails with [`LaunchError::ConfigMissing`] when required keys are absent
/// and [`LaunchError::InterpreterMissing`] when the interpreter is not on
/// `PATH`. Logs are rotated, then opened for appending.
pub fn launch(spec: &LaunchSpec, env: &BotEnv) -> LaunchResult<LaunchedProcess> {
    env.require().map_err(|e| match e {
        CoreError::MissingConfiguration { missing, env_file } => {
            LaunchError::ConfigMissing { missing, env_file }
        }
        other => LaunchError::Io(std::io::Error::other(other.to_string())),
    })?;

    let program = find_in_path(&spec.interpreter).ok_or_else(|| LaunchError::InterpreterMissing {
        program: spec.interpreter.clone(),
    })?;

    let stdout = open_log(&spec.stdout_log, spec.rotation)?;
    let stderr = open_log(&spec.stderr_log, spec.rotation)?;

    let mut cmd = Command::new(&program);
    cmd.args(&spec.args)
        .current_dir(&spec.working_dir)
        .env_clear()
        .envs(env.vars())
        .stdin(Stdio::null())
        .stdout(Stdio::from(stdout))
        .stderr(Stdio::from(stderr));

    if spec.mode == LaunchMode::Detached {
        detach(&mut cmd);
    }

    let child = cmd.spawn().map_err(|source| LaunchError::Spawn {
        program: spec.interpreter.clone(),
        source,
    })?;

    let record = ProcessRecord {
        pid: child.id(),
        started_at: Utc::now(),
        command: spec.command(),
        stdout_log: spec.stdout_log.clone(),
        stderr_log: spec.stderr_log.clone(),
    };

    info!(
        pid = record.pid,
        command = %record.command_line(),
        mode = ?spec.mode,
        env_vars = env.vars().len(),
        stdout_log = %spec.stdout_log.display(),
        "bot launched"
    );

    Ok(LaunchedProcess { record, child })
}

fn open_log(path: &Path, rotation: RotationPolicy) -> LaunchResult<File> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    if let Err(e) = rotate_if_needed(path, rotation) {
        warn!(path = %path.display(), error = %e, "log rotation failed, appending anyway");
    }
    Ok(OpenOptions::new().create(true).append(true).open(path)?)
}

#[cfg(unix)]
fn detach(cmd: &mut Command) {
    use std::os::unix::process::CommandExt;

    // Own session: no controlling terminal, survives the invoking shell.
    unsafe {
        cmd.pre_exec(|| {
            if libc::setsid() == -1 {
                return Err(std::io::Error::last_os_error());
            }
            Ok(())
        });
    }
}

#[cfg(not(unix))]
fn detach(_cmd: &mut Command) {}
