use crate::SupervisorResult;
use instance_guard::{check_instance, InstanceCheck, LaunchLock, ProcessRegistry};
use process_launcher::{launch, LaunchMode, LaunchSpec, LaunchedProcess, RotationPolicy};
use std::path::{Path, PathBuf};
use supervisor_config_and_utils::{
    BotEnv, Config, LastLaunch, Paths, StateRecord, LOG_FILE_KEY, SESSION_KEY,
};
use terminal_session_manager::{
    resolve_session_name, CaptureCommand, Multiplexer, ResolvedSession, SessionHandle,
    SessionManager,
};
use tracing::{info, warn};

/// Options for one launch invocation.
#[derive(Debug, Clone)]
pub struct LaunchRequest {
    pub session_override: Option<String>,
    pub mode: LaunchMode,
    /// Defaults to `logs/bot.log`.
    pub stdout_log: Option<PathBuf>,
    /// Defaults to `logs/bot_error.log`.
    pub stderr_log: Option<PathBuf>,
}

impl Default for LaunchRequest {
    fn default() -> Self {
        Self {
            session_override: None,
            mode: LaunchMode::Detached,
            stdout_log: None,
            stderr_log: None,
        }
    }
}

#[derive(Debug)]
pub enum LaunchOutcome {
    Launched {
        session: SessionHandle,
        process: LaunchedProcess,
    },
    /// The guard found a running instance; nothing was started.
    AlreadyRunning {
        session: SessionHandle,
        pids: Vec<u32>,
    },
}

#[derive(Debug, Clone)]
pub struct StatusReport {
    pub session: ResolvedSession,
    pub session_exists: bool,
    pub terminal_log: PathBuf,
    pub running_pids: Vec<u32>,
    pub last_launch: Option<LastLaunch>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StopReport {
    pub signalled: Vec<u32>,
    pub failed: Vec<(u32, String)>,
}

/// Ties the collaborators together for one project.
pub struct Supervisor<'a> {
    paths: &'a Paths,
    config: &'a Config,
    mux: &'a dyn Multiplexer,
    registry: &'a dyn ProcessRegistry,
    supervisor_exe: PathBuf,
}

impl<'a> Supervisor<'a> {
    pub fn new(
        paths: &'a Paths,
        config: &'a Config,
        mux: &'a dyn Multiplexer,
        registry: &'a dyn ProcessRegistry,
        supervisor_exe: PathBuf,
    ) -> Self {
        Self {
            paths,
            config,
            mux,
            registry,
            supervisor_exe,
        }
    }

    /// Resolve the session name fresh from override, state, env and default.
    pub fn resolve_session(&self, session_override: Option<&str>, env: &BotEnv) -> ResolvedSession {
        let state = StateRecord::load(&self.paths.state_file());
        resolve_session_name(
            session_override,
            state.session(),
            env.session_name(),
            &self.config.default_session,
        )
    }

    /// Terminal log for `session`: `LOG_FILE` if set, else `logs/<session>_terminal.log`.
    pub fn terminal_log(&self, session: &str, env: &BotEnv) -> PathBuf {
        match env.log_file() {
            Some(path) => self.paths.absolutize(Path::new(path)),
            None => self.paths.terminal_log(session),
        }
    }

    /// Ensure the session exists, record it, and attach capture.
    pub fn prepare_session(
        &self,
        session_override: Option<&str>,
        env: &BotEnv,
    ) -> SupervisorResult<(SessionHandle, PathBuf)> {
        let resolved = self.resolve_session(session_override, env);
        info!(session = %resolved.name, source = %resolved.source, "resolved session name");

        let manager = SessionManager::new(self.mux);
        let mut session = manager.ensure_session(&resolved.name, self.paths.project_dir())?;

        let mut state = StateRecord::load(&self.paths.state_file());
        state.set_session(&session.name);
        if let Err(e) = state.save(&self.paths.state_file()) {
            warn!(error = %e, "could not persist session name");
        }

        let log_path = self.terminal_log(&session.name, env);
        let capture = CaptureCommand::filter(&self.supervisor_exe, self.paths.project_dir(), &log_path);
        manager.attach_capture(&mut session, &capture, &log_path)?;

        Ok((session, log_path))
    }

    /// The full launch sequence. `env` is the bot environment (process env
    /// merged with `.env`).
    pub fn run_launch(&self, request: &LaunchRequest, mut env: BotEnv) -> SupervisorResult<LaunchOutcome> {
        self.paths.ensure_dirs()?;
        env.require()?;

        let (session, log_path) = self.prepare_session(request.session_override.as_deref(), &env)?;

        let _lock = LaunchLock::acquire(&self.paths.lock_file())?;

        let pattern = self.config.process_pattern();
        if let InstanceCheck::AlreadyRunning { pids } = check_instance(self.registry, pattern)? {
            info!(pattern, pids = ?pids, "bot already running, nothing to do");
            return Ok(LaunchOutcome::AlreadyRunning { session, pids });
        }

        env.set(SESSION_KEY, session.name.clone());
        env.set(LOG_FILE_KEY, log_path.to_string_lossy());

        let spec = LaunchSpec {
            interpreter: self.config.interpreter.clone(),
            args: vec![self.config.entrypoint.clone()],
            working_dir: self.paths.project_dir().to_path_buf(),
            stdout_log: self.log_or(&request.stdout_log, self.paths.bot_log()),
            stderr_log: self.log_or(&request.stderr_log, self.paths.bot_error_log()),
            rotation: RotationPolicy {
                max_bytes: self.config.max_log_bytes,
                backups: self.config.log_backups,
            },
            mode: request.mode,
        };

        let process = launch(&spec, &env)?;
        self.registry.record_start(process.record.pid)?;

        let mut state = StateRecord::load(&self.paths.state_file());
        state.set_session(&session.name);
        state.set_last_launch(LastLaunch {
            pid: process.record.pid,
            started_at: process.record.started_at.to_rfc3339(),
            command: process.record.command.clone(),
            stdout_log: process.record.stdout_log.clone(),
            stderr_log: process.record.stderr_log.clone(),
        });
        if let Err(e) = state.save(&self.paths.state_file()) {
            warn!(error = %e, "could not persist launch record");
        }

        Ok(LaunchOutcome::Launched { session, process })
    }

    pub fn status(&self, session_override: Option<&str>, env: &BotEnv) -> SupervisorResult<StatusReport> {
        let session = self.resolve_session(session_override, env);
        let manager = SessionManager::new(self.mux);
        let session_exists = manager.session_exists(&session.name);
        let terminal_log = self.terminal_log(&session.name, env);
        let running_pids = self.registry.running_pids(self.config.process_pattern())?;
        let last_launch = StateRecord::load(&self.paths.state_file()).last_launch;

        Ok(StatusReport {
            session,
            session_exists,
            terminal_log,
            running_pids,
            last_launch,
        })
    }

    /// Send SIGTERM to every running instance.
    pub fn stop(&self) -> SupervisorResult<StopReport> {
        let mut report = StopReport::default();
        for pid in self.registry.running_pids(self.config.process_pattern())? {
            match terminate(pid) {
                Ok(()) => {
                    info!(pid, "sent SIGTERM");
                    self.registry.record_stop(pid)?;
                    report.signalled.push(pid);
                }
                Err(e) if e.raw_os_error() == Some(libc::ESRCH) => {
                    info!(pid, "process already exited");
                    self.registry.record_stop(pid)?;
                }
                Err(e) => {
                    warn!(pid, error = %e, "could not signal process");
                    report.failed.push((pid, e.to_string()));
                }
            }
        }
        Ok(report)
    }

    fn log_or(&self, requested: &Option<PathBuf>, default: PathBuf) -> PathBuf {
        requested
            .as_deref()
            .map(|p| self.paths.absolutize(p))
            .unwrap_or(default)
    }
}

/// Wait for a foreground child, clear its registry record and return its
/// exit code (128 + signal when killed).
pub fn wait_foreground(mut process: LaunchedProcess, registry: &dyn ProcessRegistry) -> SupervisorResult<i32> {
    let status = process.child.wait().map_err(process_launcher::LaunchError::Io)?;
    registry.record_stop(process.record.pid)?;

    let code = exit_code(status);
    info!(pid = process.record.pid, code, "bot exited");
    Ok(code)
}

#[cfg(unix)]
fn exit_code(status: std::process::ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    status
        .code()
        .or_else(|| status.signal().map(|s| 128 + s))
        .unwrap_or(1)
}

#[cfg(not(unix))]
fn exit_code(status: std::process::ExitStatus) -> i32 {
    status.code().unwrap_or(1)
}

#[cfg(unix)]
fn terminate(pid: u32) -> std::io::Result<()> {
    let pid = libc::pid_t::try_from(pid)
        .map_err(|_| std::io::Error::new(std::io::ErrorKind::InvalidInput, "pid out of range"))?;
    // SAFETY: kill has no memory-safety preconditions.
    let rc = unsafe { libc::kill(pid, libc::SIGTERM) };
    if rc == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

#[cfg(not(unix))]
fn terminate(_pid: u32) -> std::io::Result<()> {
    Err(std::io::Error::new(std::io::ErrorKind::Unsupported, "signals not supported"))
}
