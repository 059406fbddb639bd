use super::AppContext;
use crate::error::CliResult;
use crate::LaunchArgs;
use process_launcher::LaunchMode;
use supervision_orchestrator::{wait_foreground, LaunchOutcome, LaunchRequest};
use terminal_session_manager::TmuxMultiplexer;
use tracing::info;

/// Run the launch sequence. Returns the process exit code.
pub fn launch(ctx: &AppContext, args: &LaunchArgs) -> CliResult<u8> {
    let env = ctx.bot_env()?;
    let mux = TmuxMultiplexer::new();
    let registry = ctx.registry();
    let supervisor = ctx.supervisor(&mux, registry.as_ref())?;

    let request = LaunchRequest {
        session_override: args.session.clone(),
        mode: if args.foreground {
            LaunchMode::Foreground
        } else {
            LaunchMode::Detached
        },
        stdout_log: args.stdout_log.clone(),
        stderr_log: args.stderr_log.clone(),
    };

    match supervisor.run_launch(&request, env)? {
        LaunchOutcome::AlreadyRunning { session, pids } => {
            println!(
                "Bot already running (PID {}); session '{}' is capturing. Nothing to do.",
                join_pids(&pids),
                session.name
            );
            Ok(0)
        }
        LaunchOutcome::Launched { session, process } => {
            let pid = process.record.pid;
            println!("Bot started (PID {pid}) in session '{}'", session.name);
            println!("  stdout: {}", process.record.stdout_log.display());
            println!("  stderr: {}", process.record.stderr_log.display());

            if request.mode == LaunchMode::Foreground {
                info!(pid, "waiting for bot in foreground");
                let code =
                    tokio::task::block_in_place(|| wait_foreground(process, registry.as_ref()))?;
                Ok(clamp_exit_code(code))
            } else {
                Ok(0)
            }
        }
    }
}

pub(crate) fn join_pids(pids: &[u32]) -> String {
    pids.iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn clamp_exit_code(code: i32) -> u8 {
    u8::try_from(code).unwrap_or(1)
}
