//! Multiplexer abstraction and the tmux implementation.

use crate::{SessionError, SessionResult};
use std::path::Path;
use std::process::{Command, Output, Stdio};
use tracing::debug;

/// Operations the supervisor needs from a terminal multiplexer.
pub trait Multiplexer {
    /// Executable name, for diagnostics.
    fn program(&self) -> &str;

    /// Whether the multiplexer binary can be executed at all.
    fn is_available(&self) -> bool;

    fn has_session(&self, name: &str) -> SessionResult<bool>;

    fn list_sessions(&self) -> SessionResult<Vec<String>>;

    /// Create a detached session running the default shell in `working_dir`.
    fn new_session(&self, name: &str, working_dir: &Path) -> SessionResult<()>;

    /// Pipe the output of the session's active pane into `shell_command`.
    fn pipe_pane(&self, name: &str, shell_command: &str) -> SessionResult<()>;

    /// Close any pipe on the session's active pane. Succeeds when none is attached.
    fn stop_pipe(&self, name: &str) -> SessionResult<()>;
}

/// `tmux` driven through its command line.
#[derive(Debug, Clone)]
pub struct TmuxMultiplexer {
    program: String,
    /// Server socket name (`-L`); `None` uses the default server.
    socket: Option<String>,
}

impl Default for TmuxMultiplexer {
    fn default() -> Self {
        Self::new()
    }
}

impl TmuxMultiplexer {
    pub fn new() -> Self {
        Self::with_program("tmux")
    }

    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            socket: None,
        }
    }

    /// Talk to a separate tmux server named `socket`.
    pub fn with_socket(mut self, socket: impl Into<String>) -> Self {
        self.socket = Some(socket.into());
        self
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.program);
        if let Some(socket) = &self.socket {
            command.arg("-L").arg(socket);
        }
        command
    }

    fn run(&self, args: &[&str]) -> SessionResult<Output> {
        debug!(program = %self.program, args = ?args, "running multiplexer command");

        self.command()
            .args(args)
            .stdin(Stdio::null())
            .output()
            .map_err(|err| {
                if err.kind() == std::io::ErrorKind::NotFound {
                    SessionError::MultiplexerUnavailable {
                        program: self.program.clone(),
                    }
                } else {
                    SessionError::Io(err)
                }
            })
    }

    fn run_checked(&self, args: &[&str]) -> SessionResult<Output> {
        let output = self.run(args)?;
        if output.status.success() {
            Ok(output)
        } else {
            Err(SessionError::CommandFailed {
                command: format!("{} {}", self.program, args.join(" ")),
                detail: failure_detail(&output),
            })
        }
    }
}

impl Multiplexer for TmuxMultiplexer {
    fn program(&self) -> &str {
        &self.program
    }

    fn is_available(&self) -> bool {
        Command::new(&self.program)
            .arg("-V")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    fn has_session(&self, name: &str) -> SessionResult<bool> {
        // `=` forces an exact match instead of tmux's prefix matching.
        let target = format!("={name}");
        let output = self.run(&["has-session", "-t", &target])?;
        Ok(output.status.success())
    }

    fn list_sessions(&self) -> SessionResult<Vec<String>> {
        let output = self.run(&["list-sessions", "-F", "#{session_name}"])?;
        if !output.status.success() {
            // No server running means no sessions.
            return Ok(Vec::new());
        }
        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect())
    }

    fn new_session(&self, name: &str, working_dir: &Path) -> SessionResult<()> {
        let dir = working_dir.to_string_lossy();
        let output = self.run(&["new-session", "-d", "-s", name, "-c", &dir])?;
        if output.status.success() {
            Ok(())
        } else {
            Err(SessionError::CreationFailed {
                name: name.to_string(),
                detail: failure_detail(&output),
            })
        }
    }

    fn pipe_pane(&self, name: &str, shell_command: &str) -> SessionResult<()> {
        let target = pane_target(name);
        self.run_checked(&["pipe-pane", "-o", "-t", &target, shell_command])?;
        Ok(())
    }

    fn stop_pipe(&self, name: &str) -> SessionResult<()> {
        let target = pane_target(name);
        self.run_checked(&["pipe-pane", "-t", &target])?;
        Ok(())
    }
}

/// Active pane of the session named exactly `name`. `pipe-pane` rejects a
/// bare session target.
fn pane_target(name: &str) -> String {
    format!("={name}:")
}

fn failure_detail(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    if stderr.is_empty() {
        format!("exited with {}", output.status)
    } else {
        stderr
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CaptureCommand, SessionManager};

    /// A private tmux server, killed on drop.
    struct Server {
        mux: TmuxMultiplexer,
        socket: String,
    }

    impl Server {
        fn start(tag: &str) -> Option<Self> {
            let socket = format!("bot-supervisor-test-{tag}-{}", std::process::id());
            let mux = TmuxMultiplexer::new().with_socket(socket.clone());
            mux.is_available().then_some(Self { mux, socket })
        }
    }

    impl Drop for Server {
        fn drop(&mut self) {
            let _ = Command::new("tmux")
                .args(["-L", &self.socket, "kill-server"])
                .stderr(Stdio::null())
                .status();
        }
    }

    #[test]
    fn pane_target_addresses_the_active_pane() {
        assert_eq!(pane_target("claude"), "=claude:");
    }

    #[test]
    fn capture_attaches_to_a_real_session() {
        let Some(server) = Server::start("pipe") else {
            return;
        };
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("logs").join("pipe_terminal.log");
        let manager = SessionManager::new(&server.mux);

        let mut session = manager.ensure_session("pipe", dir.path()).unwrap();
        assert!(session.created);

        let command = CaptureCommand::new("sh")
            .arg("-c")
            .arg(format!("cat >> {}", log_path.display()));
        manager.attach_capture(&mut session, &command, &log_path).unwrap();
        manager.attach_capture(&mut session, &command, &log_path).unwrap();
        assert!(session.is_capturing());

        server.mux.stop_pipe("pipe").unwrap();
    }

    #[test]
    fn concurrent_ensure_on_a_real_server_is_idempotent() {
        let Some(server) = Server::start("race") else {
            return;
        };
        let dir = tempfile::tempdir().unwrap();
        SessionManager::new(&server.mux)
            .ensure_session("warmup", dir.path())
            .unwrap();

        let results: Vec<SessionResult<bool>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    let mux = server.mux.clone();
                    let dir = dir.path().to_path_buf();
                    scope.spawn(move || {
                        SessionManager::new(&mux)
                            .ensure_session("raced", &dir)
                            .map(|handle| handle.created)
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let created = results.iter().filter(|r| matches!(r, Ok(true))).count();
        assert!(results.iter().all(Result::is_ok), "{results:?}");
        assert!(created <= 1);
        assert!(server.mux.has_session("raced").unwrap());
    }

    #[test]
    fn missing_binary_is_unavailable() {
        let mux = TmuxMultiplexer::with_program("tmux-that-does-not-exist-4821");
        assert!(!mux.is_available());
        assert!(matches!(
            mux.has_session("claude"),
            Err(SessionError::MultiplexerUnavailable { .. })
        ));
        assert!(matches!(
            mux.new_session("claude", Path::new("/tmp")),
            Err(SessionError::MultiplexerUnavailable { .. })
        ));
    }

    #[test]
    fn failing_command_reports_stderr() {
        // `false` exits 1 for any arguments, standing in for a tmux failure.
        let mux = TmuxMultiplexer::with_program("false");
        assert!(!mux.has_session("claude").unwrap());
        assert!(mux.list_sessions().unwrap().is_empty());
        match mux.new_session("claude", Path::new("/tmp")) {
            Err(SessionError::CreationFailed { name, detail }) => {
                assert_eq!(name, "claude");
                assert!(detail.contains("exited with"));
            }
            other => panic!("expected creation failure, got {other:?}"),
        }
        assert!(matches!(
            mux.stop_pipe("claude"),
            Err(SessionError::CommandFailed { .. })
        ));
    }
}
