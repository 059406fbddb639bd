use super::autostart::current_autostart;
use super::launch::join_pids;
use super::AppContext;
use crate::error::{CliError, CliResult, FailureKind};
use supervisor_config_and_utils::check_dependency;
use terminal_session_manager::TmuxMultiplexer;

pub fn status(ctx: &AppContext, session_override: Option<&str>) -> CliResult<u8> {
    let env = ctx.bot_env()?;
    let mux = TmuxMultiplexer::new();
    let registry = ctx.registry();
    let supervisor = ctx.supervisor(&mux, registry.as_ref())?;
    let report = supervisor.status(session_override, &env)?;

    println!("Bot Supervisor Status");
    println!("=====================");
    println!("Project:      {}", ctx.paths.project_dir().display());
    println!(
        "Config:       {}",
        if env.file_present() {
            ".env present"
        } else {
            ".env missing"
        }
    );
    println!(
        "Session:      {} ({}), {}",
        report.session.name,
        report.session.source,
        if report.session_exists {
            "exists"
        } else {
            "not created"
        }
    );
    println!("Terminal log: {}", report.terminal_log.display());

    if report.running_pids.is_empty() {
        println!("Bot:          not running");
    } else {
        println!("Bot:          running (PID {})", join_pids(&report.running_pids));
    }

    if let Some(last) = &report.last_launch {
        println!("Last launch:  PID {} at {}", last.pid, last.started_at);
        println!("  command:    {}", last.command.join(" "));
        println!("  stdout:     {}", last.stdout_log.display());
        println!("  stderr:     {}", last.stderr_log.display());
    }

    let autostart = current_autostart(ctx)?;
    println!("Autostart:    service {}, cron {}", autostart.service, autostart.cron);
    if autostart.conflicting() {
        println!("  warning: both variants are active");
    }

    println!();
    println!("Dependencies:");
    for name in ["tmux", ctx.config.interpreter.as_str(), "systemctl", "crontab"] {
        let dep = check_dependency(name);
        match &dep.path {
            Some(path) => println!("  {name}: {}", path.display()),
            None => println!("  {name}: missing ({})", dep.install_hint()),
        }
    }

    Ok(0)
}

pub fn stop(ctx: &AppContext) -> CliResult<u8> {
    let mux = TmuxMultiplexer::new();
    let registry = ctx.registry();
    let supervisor = ctx.supervisor(&mux, registry.as_ref())?;
    let report = supervisor.stop()?;

    if report.signalled.is_empty() && report.failed.is_empty() {
        println!("Bot is not running");
        return Ok(0);
    }
    if !report.signalled.is_empty() {
        println!("Sent SIGTERM to PID {}", join_pids(&report.signalled));
    }
    if report.failed.is_empty() {
        return Ok(0);
    }

    let details: Vec<String> = report
        .failed
        .iter()
        .map(|(pid, reason)| format!("PID {pid}: {reason}"))
        .collect();
    Err(CliError::new(
        FailureKind::General,
        format!("could not signal {}", details.join("; ")),
    )
    .with_hint("processes owned by another user need sudo"))
}
