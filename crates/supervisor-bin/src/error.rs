//! Process exit classification.

use autostart_registrar::AutostartError;
use escape_sequence_filter::FilterError;
use instance_guard::GuardError;
use process_launcher::LaunchError;
use supervision_orchestrator::SupervisorError;
use supervisor_config_and_utils::{install_hint, CoreError};
use terminal_session_manager::SessionError;
use thiserror::Error;

/// Failure categories, each with a fixed exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    General,
    MissingConfiguration,
    MissingDependency,
    SessionCreation,
    Permission,
}

impl FailureKind {
    pub fn exit_code(self) -> u8 {
        match self {
            Self::General => 1,
            Self::MissingConfiguration => 2,
            Self::MissingDependency => 3,
            Self::SessionCreation => 4,
            Self::Permission => 5,
        }
    }
}

/// A fatal error with a remediation hint.
#[derive(Error, Debug)]
#[error("{message}")]
pub struct CliError {
    pub kind: FailureKind,
    pub message: String,
    pub hint: Option<String>,
}

pub type CliResult<T> = Result<T, CliError>;

impl CliError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            hint: None,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    fn missing_dependency(program: &str, message: String) -> Self {
        Self::new(FailureKind::MissingDependency, message).with_hint(install_hint(program))
    }
}

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> Self {
        Self::new(FailureKind::General, format!("{err:#}"))
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        Self::new(FailureKind::General, err.to_string())
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        let message = err.to_string();
        match err {
            CoreError::MissingConfiguration { env_file, .. } => {
                Self::new(FailureKind::MissingConfiguration, message).with_hint(format!(
                    "add BOT_TOKEN=... and ALLOWED_CHAT_ID=... to {}",
                    env_file.display()
                ))
            }
            CoreError::Config(_) | CoreError::Json(_) => {
                Self::new(FailureKind::MissingConfiguration, message)
                    .with_hint("fix or remove data/supervisor.json")
            }
            CoreError::Io(_) | CoreError::Path(_) => Self::new(FailureKind::General, message),
        }
    }
}

impl From<SessionError> for CliError {
    fn from(err: SessionError) -> Self {
        let message = err.to_string();
        match err {
            SessionError::MultiplexerUnavailable { program } => {
                Self::missing_dependency(&program, message)
            }
            SessionError::CreationFailed { name, .. } => {
                Self::new(FailureKind::SessionCreation, message).with_hint(format!(
                    "check `tmux ls` and try `tmux new-session -d -s {name}` by hand"
                ))
            }
            SessionError::CommandFailed { .. } | SessionError::Io(_) => {
                Self::new(FailureKind::General, message)
            }
        }
    }
}

impl From<GuardError> for CliError {
    fn from(err: GuardError) -> Self {
        Self::new(FailureKind::General, err.to_string())
    }
}

impl From<LaunchError> for CliError {
    fn from(err: LaunchError) -> Self {
        let message = err.to_string();
        match err {
            LaunchError::ConfigMissing { env_file, .. } => {
                Self::new(FailureKind::MissingConfiguration, message).with_hint(format!(
                    "add BOT_TOKEN=... and ALLOWED_CHAT_ID=... to {}",
                    env_file.display()
                ))
            }
            LaunchError::InterpreterMissing { program } => Self::missing_dependency(&program, message),
            LaunchError::Spawn { .. } | LaunchError::Io(_) => Self::new(FailureKind::General, message),
        }
    }
}

impl From<SupervisorError> for CliError {
    fn from(err: SupervisorError) -> Self {
        match err {
            SupervisorError::Core(e) => e.into(),
            SupervisorError::Session(e) => e.into(),
            SupervisorError::Guard(e) => e.into(),
            SupervisorError::Launch(e) => e.into(),
        }
    }
}

impl From<AutostartError> for CliError {
    fn from(err: AutostartError) -> Self {
        let message = err.to_string();
        match err {
            AutostartError::Permission { .. } => Self::new(FailureKind::Permission, message)
                .with_hint("re-run the same command with sudo, or use `--variant cron`"),
            AutostartError::MissingDependency { program } => {
                Self::missing_dependency(&program, message)
            }
            AutostartError::Io(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                Self::new(FailureKind::Permission, message).with_hint("re-run the same command with sudo")
            }
            AutostartError::CommandFailed { .. } | AutostartError::Io(_) => {
                Self::new(FailureKind::General, message)
            }
        }
    }
}

impl From<FilterError> for CliError {
    fn from(err: FilterError) -> Self {
        let message = err.to_string();
        match err {
            FilterError::InvalidRule { .. } => Self::new(FailureKind::MissingConfiguration, message)
                .with_hint("fix extra_sanitize_rules in data/supervisor.json"),
            FilterError::Io(_) => Self::new(FailureKind::General, message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn exit_codes_are_stable() {
        assert_eq!(FailureKind::General.exit_code(), 1);
        assert_eq!(FailureKind::MissingConfiguration.exit_code(), 2);
        assert_eq!(FailureKind::MissingDependency.exit_code(), 3);
        assert_eq!(FailureKind::SessionCreation.exit_code(), 4);
        assert_eq!(FailureKind::Permission.exit_code(), 5);
    }

    #[test]
    fn missing_configuration_through_the_orchestrator() {
        let err: CliError = SupervisorError::Core(CoreError::MissingConfiguration {
            missing: vec!["BOT_TOKEN".into()],
            env_file: PathBuf::from("/srv/bot/.env"),
        })
        .into();
        assert_eq!(err.kind, FailureKind::MissingConfiguration);
        assert!(err.hint.unwrap().contains("/srv/bot/.env"));
    }

    #[test]
    fn missing_tmux_is_a_dependency_failure() {
        let err: CliError = SupervisorError::Session(SessionError::MultiplexerUnavailable {
            program: "tmux".into(),
        })
        .into();
        assert_eq!(err.kind.exit_code(), 3);
        assert!(err.hint.unwrap().contains("apt install tmux"));
    }

    #[test]
    fn session_creation_failure() {
        let err: CliError = SessionError::CreationFailed {
            name: "claude".into(),
            detail: "server exited".into(),
        }
        .into();
        assert_eq!(err.kind, FailureKind::SessionCreation);
    }

    #[test]
    fn missing_interpreter_points_at_config() {
        let err: CliError = LaunchError::InterpreterMissing {
            program: "python3".into(),
        }
        .into();
        assert_eq!(err.kind, FailureKind::MissingDependency);
        assert!(err.hint.unwrap().contains("interpreter"));
    }

    #[test]
    fn permission_errors_suggest_sudo() {
        let err: CliError = AutostartError::Permission {
            action: "installing a systemd unit".into(),
        }
        .into();
        assert_eq!(err.kind.exit_code(), 5);
        assert!(err.hint.unwrap().contains("sudo"));

        let io: CliError =
            AutostartError::Io(std::io::Error::from(std::io::ErrorKind::PermissionDenied)).into();
        assert_eq!(io.kind, FailureKind::Permission);
    }

    #[test]
    fn anyhow_errors_are_general() {
        let err: CliError = anyhow::anyhow!("boom").into();
        assert_eq!(err.kind, FailureKind::General);
        assert_eq!(err.to_string(), "boom");
    }

    #[test]
    fn io_errors_are_general() {
        let err: CliError = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "stdout closed").into();
        assert_eq!(err.kind.exit_code(), 1);
        assert_eq!(err.to_string(), "stdout closed");
        assert!(err.hint.is_none());
    }
}
