use instance_guard::GuardError;
use process_launcher::LaunchError;
use supervisor_config_and_utils::CoreError;
use terminal_session_manager::SessionError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SupervisorError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Guard(#[from] GuardError),

    #[error(transparent)]
    Launch(#[from] LaunchError),
}

pub type SupervisorResult<T> = Result<T, SupervisorError>;
