use super::AppContext;
use crate::error::CliResult;
use terminal_session_manager::TmuxMultiplexer;

/// Print the name a launch would use and where it came from.
pub fn session_name(ctx: &AppContext, session_override: Option<&str>) -> CliResult<u8> {
    let env = ctx.bot_env()?;
    let mux = TmuxMultiplexer::new();
    let registry = ctx.registry();
    let supervisor = ctx.supervisor(&mux, registry.as_ref())?;

    let resolved = supervisor.resolve_session(session_override, &env);
    println!("{}", resolved.name);
    tracing::debug!(session = %resolved.name, source = %resolved.source, "resolved session name");
    Ok(0)
}

/// Create the session if needed and (re)attach capture without launching.
pub fn session_ensure(ctx: &AppContext, session_override: Option<&str>) -> CliResult<u8> {
    let env = ctx.bot_env()?;
    let mux = TmuxMultiplexer::new();
    let registry = ctx.registry();
    let supervisor = ctx.supervisor(&mux, registry.as_ref())?;

    let (session, log_path) = supervisor.prepare_session(session_override, &env)?;
    println!(
        "Session '{}' {} in {}",
        session.name,
        if session.created { "created" } else { "ready" },
        session.working_dir.display()
    );
    println!("Capturing to {}", log_path.display());
    println!("Attach with: tmux attach -t {}", session.name);
    Ok(0)
}
