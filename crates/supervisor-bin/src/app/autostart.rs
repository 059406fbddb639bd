use super::{supervisor_exe, AppContext};
use crate::error::CliResult;
use crate::prompt::confirm;
use crate::LaunchArgs;
use autostart_registrar::{
    is_elevated, ActivationOutcome, AutostartHost, AutostartStatus, DeactivationOutcome,
    Registrar, RestartPolicy, ScheduledJob, ServiceUnit, Systemctl, SystemCrontab, Variant,
    WrapperScript, SYSTEM_UNIT_DIR,
};
use std::path::{Path, PathBuf};
use supervisor_config_and_utils::{Config, Paths};
use tracing::info;

/// Install `variant`, optionally starting the bot afterwards.
pub fn autostart_install(
    ctx: &AppContext,
    variant: Variant,
    exclusive: bool,
    start_now: bool,
    assume_yes: bool,
) -> CliResult<u8> {
    let exe = supervisor_exe()?;
    let (unit, job) = registrations(&ctx.paths, &ctx.config, &exe, invoking_user(), path_env());
    let services = Systemctl::new();
    let crontab = SystemCrontab::new();
    let registrar = Registrar::new(unit, job, host(&services, &crontab));

    let exclusive = exclusive || ctx.config.exclusive_autostart;
    match registrar.activate(variant, exclusive)? {
        ActivationOutcome::Registered => println!("Autostart ({variant}) registered"),
        ActivationOutcome::AlreadyRegistered => {
            println!("Autostart ({variant}) already registered, nothing changed")
        }
    }

    let status = registrar.status();
    if status.conflicting() {
        println!("Note: both service and cron autostart are active; pass --exclusive to keep one");
    }

    if !start_now {
        println!("The bot was not started. Run `bot-supervisor launch` to start it now.");
        return Ok(0);
    }
    if !assume_yes && !confirm("Start the bot now?")? {
        println!("Skipped. The bot will start at next boot.");
        return Ok(0);
    }

    info!(variant = %variant, "starting bot after autostart install");
    match variant {
        Variant::Service => {
            registrar.start_service()?;
            println!("Service started");
            Ok(0)
        }
        Variant::Cron => super::launch(
            ctx,
            &LaunchArgs {
                stdout_log: Some(ctx.paths.cron_bot_log()),
                stderr_log: Some(ctx.paths.cron_bot_error_log()),
                ..LaunchArgs::default()
            },
        ),
    }
}

/// Remove `variant`. Removing something absent is not an error.
pub fn autostart_remove(ctx: &AppContext, variant: Variant) -> CliResult<u8> {
    let exe = supervisor_exe()?;
    let (unit, job) = registrations(&ctx.paths, &ctx.config, &exe, invoking_user(), path_env());
    let services = Systemctl::new();
    let crontab = SystemCrontab::new();
    let registrar = Registrar::new(unit, job, host(&services, &crontab));

    match registrar.deactivate(variant)? {
        DeactivationOutcome::Removed => println!("Autostart ({variant}) removed"),
        DeactivationOutcome::NotPresent => println!("Autostart ({variant}) was not registered"),
    }
    println!("A running bot is left running; use `bot-supervisor stop` to stop it.");
    Ok(0)
}

pub fn autostart_status(ctx: &AppContext) -> CliResult<u8> {
    let status = current_autostart(ctx)?;
    println!("service ({}): {}", ctx.config.service_name, status.service);
    println!("cron:    {}", status.cron);
    if status.conflicting() {
        println!("warning: both variants are active");
    }
    Ok(0)
}

pub(super) fn current_autostart(ctx: &AppContext) -> CliResult<AutostartStatus> {
    let exe = supervisor_exe()?;
    let (unit, job) = registrations(&ctx.paths, &ctx.config, &exe, invoking_user(), path_env());
    let services = Systemctl::new();
    let crontab = SystemCrontab::new();
    Ok(Registrar::new(unit, job, host(&services, &crontab)).status())
}

fn host<'a>(services: &'a Systemctl, crontab: &'a SystemCrontab) -> AutostartHost<'a> {
    AutostartHost {
        services,
        crontab,
        unit_dir: PathBuf::from(SYSTEM_UNIT_DIR),
        elevated: is_elevated(),
    }
}

/// The account that ran `sudo`, so the unit does not run the bot as root.
fn invoking_user() -> Option<String> {
    std::env::var("SUDO_USER")
        .ok()
        .filter(|user| !user.is_empty() && user != "root")
}

fn path_env() -> Option<String> {
    std::env::var("PATH").ok().filter(|p| !p.is_empty())
}

/// Both registrations for this project. The service runs the launcher in
/// the foreground so systemd's restart policy covers the bot.
fn registrations(
    paths: &Paths,
    config: &Config,
    exe: &Path,
    user: Option<String>,
    path_env: Option<String>,
) -> (ServiceUnit, ScheduledJob) {
    let project = paths.project_dir();

    let unit = ServiceUnit {
        name: config.service_name.clone(),
        description: format!("Chat bot supervisor for {}", project.display()),
        working_dir: project.to_path_buf(),
        exec_start: vec![
            exe.to_string_lossy().into_owned(),
            "--project-dir".to_string(),
            project.to_string_lossy().into_owned(),
            "launch".to_string(),
            "--foreground".to_string(),
        ],
        restart: RestartPolicy {
            delay_secs: config.restart_delay_secs,
        },
        stdout_log: paths.bot_log(),
        stderr_log: paths.bot_error_log(),
        user,
    };

    let job = ScheduledJob {
        script_path: paths.cron_wrapper_script(),
        script: WrapperScript {
            project_dir: project.to_path_buf(),
            supervisor_exe: exe.to_path_buf(),
            stdout_log: paths.cron_bot_log(),
            stderr_log: paths.cron_bot_error_log(),
            path_env,
        },
    };

    (unit, job)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> (ServiceUnit, ScheduledJob) {
        let paths = Paths::new(PathBuf::from("/srv/bot"));
        let mut config = Config::default();
        config.service_name = "telegram-bot".to_string();
        config.restart_delay_secs = 15;
        registrations(
            &paths,
            &config,
            Path::new("/usr/local/bin/bot-supervisor"),
            Some("alice".to_string()),
            Some("/usr/local/bin:/usr/bin".to_string()),
        )
    }

    #[test]
    fn service_runs_launcher_in_foreground() {
        let (unit, _) = fixture();
        assert_eq!(unit.name, "telegram-bot");
        assert_eq!(unit.file_name(), "telegram-bot.service");
        assert_eq!(
            unit.exec_start,
            vec![
                "/usr/local/bin/bot-supervisor",
                "--project-dir",
                "/srv/bot",
                "launch",
                "--foreground"
            ]
        );
        assert_eq!(unit.restart.delay_secs, 15);
        assert_eq!(unit.stdout_log, PathBuf::from("/srv/bot/logs/bot.log"));
        assert_eq!(unit.user.as_deref(), Some("alice"));

        let rendered = unit.to_unit_file().render();
        assert!(rendered.contains("Restart=always"));
        assert!(rendered.contains("RestartSec=15"));
        assert!(rendered.contains("WorkingDirectory=/srv/bot"));
    }

    #[test]
    fn cron_job_uses_wrapper_and_cron_logs() {
        let (_, job) = fixture();
        assert_eq!(job.script_path, PathBuf::from("/srv/bot/data/autostart-cron.sh"));
        assert_eq!(job.entry_line(), "@reboot /srv/bot/data/autostart-cron.sh");
        assert_eq!(job.script.stdout_log, PathBuf::from("/srv/bot/logs/cron_bot.log"));

        let script = job.script.render();
        assert!(script.contains("/usr/local/bin/bot-supervisor"));
        assert!(script.contains("cron_bot.log"));
    }
}
