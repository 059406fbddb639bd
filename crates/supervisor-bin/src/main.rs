//! bot-supervisor - keeps a chat bot running inside a captured tmux session.

mod app;
mod error;
mod prompt;

use app::{AppContext, RegistryKind};
use clap::{Args, Parser, Subcommand, ValueEnum};
use error::{CliError, CliResult};
use std::path::PathBuf;
use std::process::ExitCode;
use supervisor_config_and_utils::{init_logging, Config, Paths};

#[derive(Parser, Debug)]
#[command(name = "bot-supervisor")]
#[command(about = "Launch, guard and autostart a chat bot inside a tmux session")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Bot project directory (contains .env and the entrypoint)
    #[arg(long, global = true, env = "BOT_SUPERVISOR_PROJECT_DIR")]
    project_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); defaults to the configured level
    #[arg(short, long, global = true, env = "BOT_SUPERVISOR_LOG_LEVEL")]
    log_level: Option<String>,

    /// How running bot instances are detected
    #[arg(long, global = true, value_enum, default_value_t = RegistryKind::ProcessTable, env = "BOT_SUPERVISOR_REGISTRY")]
    registry: RegistryKind,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ensure the session and capture, then start the bot unless it is already running
    Launch(LaunchArgs),

    /// Show session, process and autostart state
    Status {
        #[arg(long)]
        session: Option<String>,
    },

    /// Send SIGTERM to every running bot instance
    Stop,

    /// Strip terminal escape sequences from stdin and append to a log file
    Filter {
        #[arg(long)]
        output: PathBuf,
    },

    /// Inspect or prepare the terminal session
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },

    /// Manage start-at-boot registration
    Autostart {
        #[command(subcommand)]
        action: AutostartAction,
    },
}

#[derive(Args, Debug, Default)]
pub struct LaunchArgs {
    /// Session name override (highest precedence)
    #[arg(long)]
    pub session: Option<String>,

    /// Wait for the bot and exit with its status (used by the service unit)
    #[arg(long)]
    pub foreground: bool,

    #[arg(long)]
    pub stdout_log: Option<PathBuf>,

    #[arg(long)]
    pub stderr_log: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum SessionAction {
    /// Print the session name that a launch would use
    Name {
        #[arg(long)]
        session: Option<String>,
    },
    /// Create the session if needed and attach capture
    Ensure {
        #[arg(long)]
        session: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum AutostartAction {
    /// Register a start-at-boot variant
    Install {
        #[arg(long, value_enum)]
        variant: VariantArg,

        /// Remove the other variant if it is registered
        #[arg(long)]
        exclusive: bool,

        /// Offer to start the bot right away
        #[arg(long)]
        start_now: bool,

        /// Answer yes to the start prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Remove a start-at-boot variant
    Remove {
        #[arg(long, value_enum)]
        variant: VariantArg,
    },
    /// Show both variants
    Status,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum VariantArg {
    Service,
    Cron,
}

impl From<VariantArg> for autostart_registrar::Variant {
    fn from(arg: VariantArg) -> Self {
        match arg {
            VariantArg::Service => Self::Service,
            VariantArg::Cron => Self::Cron,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            tracing::error!(error = %err, code = err.kind.exit_code(), "command failed");
            eprintln!("error: {err}");
            if let Some(hint) = &err.hint {
                eprintln!("hint: {hint}");
            }
            ExitCode::from(err.kind.exit_code())
        }
    }
}

async fn run(cli: Cli) -> CliResult<u8> {
    let paths = Paths::resolve(cli.project_dir.as_deref())?;
    paths.ensure_dirs()?;
    let config = Config::load(&paths)?;

    let level = cli.log_level.as_deref().unwrap_or(config.log_level.as_str());
    let is_filter = matches!(cli.command, Commands::Filter { .. });
    if is_filter {
        // stderr of the capture pipe goes nowhere
        init_logging("capture-filter", level, Some(&paths.supervisor_log()), false);
    } else {
        init_logging("supervisor", level, Some(&paths.supervisor_log()), true);
    }
    tracing::debug!(project = %paths.project_dir().display(), "supervisor invoked");

    let ctx = AppContext::new(paths, config, cli.registry);

    match cli.command {
        Commands::Launch(args) => app::launch(&ctx, &args),
        Commands::Status { session } => app::status(&ctx, session.as_deref()),
        Commands::Stop => app::stop(&ctx),
        Commands::Filter { output } => app::filter(&ctx, &output).await,
        Commands::Session { action } => match action {
            SessionAction::Name { session } => app::session_name(&ctx, session.as_deref()),
            SessionAction::Ensure { session } => app::session_ensure(&ctx, session.as_deref()),
        },
        Commands::Autostart { action } => match action {
            AutostartAction::Install {
                variant,
                exclusive,
                start_now,
                yes,
            } => app::autostart_install(&ctx, variant.into(), exclusive, start_now, yes),
            AutostartAction::Remove { variant } => app::autostart_remove(&ctx, variant.into()),
            AutostartAction::Status => app::autostart_status(&ctx),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_service_unit_exec_start() {
        let cli = Cli::try_parse_from([
            "bot-supervisor",
            "--project-dir",
            "/srv/bot",
            "launch",
            "--foreground",
        ])
        .unwrap();

        assert_eq!(cli.project_dir, Some(PathBuf::from("/srv/bot")));
        match cli.command {
            Commands::Launch(args) => {
                assert!(args.foreground);
                assert!(args.session.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_capture_pipe_command() {
        let cli = Cli::try_parse_from([
            "bot-supervisor",
            "--project-dir",
            "/srv/bot",
            "filter",
            "--output",
            "/srv/bot/logs/claude_terminal.log",
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::Filter { .. }));
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "bot-supervisor",
            "status",
            "--log-level",
            "debug",
            "--registry",
            "pid-file",
        ])
        .unwrap();
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        assert_eq!(cli.registry, RegistryKind::PidFile);
    }

    #[test]
    fn autostart_install_requires_variant() {
        assert!(Cli::try_parse_from(["bot-supervisor", "autostart", "install"]).is_err());

        let cli = Cli::try_parse_from([
            "bot-supervisor",
            "autostart",
            "install",
            "--variant",
            "cron",
            "--exclusive",
            "--start-now",
            "-y",
        ])
        .unwrap();
        match cli.command {
            Commands::Autostart {
                action:
                    AutostartAction::Install {
                        variant,
                        exclusive,
                        start_now,
                        yes,
                    },
            } => {
                assert_eq!(variant, VariantArg::Cron);
                assert!(exclusive && start_now && yes);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
