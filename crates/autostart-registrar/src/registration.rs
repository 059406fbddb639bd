//! Registration variants and the registrar that switches between them.

use crate::{
    AutostartError, AutostartResult, CrontabStore, JobState, ScheduledJob, ServiceManager,
    ServiceState, ServiceUnit,
};
use std::fmt;
use std::path::PathBuf;
use tracing::{info, warn};

/// Which persistence strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    Service,
    Cron,
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Service => write!(f, "service"),
            Self::Cron => write!(f, "cron"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivationOutcome {
    Registered,
    /// An identical registration was already in place; nothing changed.
    AlreadyRegistered,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeactivationOutcome {
    Removed,
    NotPresent,
}

/// The OS facilities registrations act on.
pub struct AutostartHost<'a> {
    pub services: &'a dyn ServiceManager,
    pub crontab: &'a dyn CrontabStore,
    pub unit_dir: PathBuf,
    /// Whether the current process may write system units.
    pub elevated: bool,
}

/// Whether the process runs as root.
#[cfg(unix)]
pub fn is_elevated() -> bool {
    // SAFETY: geteuid has no preconditions and cannot fail.
    unsafe { libc::geteuid() == 0 }
}

#[cfg(not(unix))]
pub fn is_elevated() -> bool {
    false
}

/// One of the two mutually exclusive ways to start the supervisor at boot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AutostartRegistration {
    ServiceUnit(ServiceUnit),
    ScheduledJob(ScheduledJob),
}

impl AutostartRegistration {
    pub fn variant(&self) -> Variant {
        match self {
            Self::ServiceUnit(_) => Variant::Service,
            Self::ScheduledJob(_) => Variant::Cron,
        }
    }

    /// Install this registration. Idempotent.
    pub fn activate(&self, host: &AutostartHost<'_>) -> AutostartResult<ActivationOutcome> {
        match self {
            Self::ServiceUnit(unit) => activate_service(unit, host),
            Self::ScheduledJob(job) => activate_job(job, host),
        }
    }

    /// Remove this registration. Idempotent; never stops a running bot.
    pub fn deactivate(&self, host: &AutostartHost<'_>) -> AutostartResult<DeactivationOutcome> {
        match self {
            Self::ServiceUnit(unit) => deactivate_service(unit, host),
            Self::ScheduledJob(job) => deactivate_job(job, host),
        }
    }

    /// Whether this registration would take effect at next boot.
    pub fn is_active(&self, host: &AutostartHost<'_>) -> bool {
        match self {
            Self::ServiceUnit(unit) => service_state(unit, host) >= ServiceState::Enabled,
            Self::ScheduledJob(job) => job_state(job, host) == JobState::Registered,
        }
    }
}

fn require_elevated(host: &AutostartHost<'_>, action: &str) -> AutostartResult<()> {
    if host.elevated {
        Ok(())
    } else {
        Err(AutostartError::Permission {
            action: action.to_string(),
        })
    }
}

fn require_systemd(host: &AutostartHost<'_>) -> AutostartResult<()> {
    if host.services.is_available() {
        Ok(())
    } else {
        Err(AutostartError::MissingDependency {
            program: "systemctl".to_string(),
        })
    }
}

fn require_crontab(host: &AutostartHost<'_>) -> AutostartResult<()> {
    if host.crontab.is_available() {
        Ok(())
    } else {
        Err(AutostartError::MissingDependency {
            program: "crontab".to_string(),
        })
    }
}

fn activate_service(unit: &ServiceUnit, host: &AutostartHost<'_>) -> AutostartResult<ActivationOutcome> {
    require_elevated(host, "installing a systemd unit")?;
    require_systemd(host)?;

    let path = unit.path_in(&host.unit_dir);
    let content = unit.to_unit_file().render();
    let file_name = unit.file_name();

    let unchanged = std::fs::read_to_string(&path)
        .map(|existing| existing == content)
        .unwrap_or(false);
    if unchanged && host.services.is_enabled(&file_name) {
        info!(unit = %file_name, "service unit already installed and enabled");
        return Ok(ActivationOutcome::AlreadyRegistered);
    }

    std::fs::create_dir_all(&host.unit_dir)?;
    std::fs::write(&path, content)?;
    host.services.daemon_reload()?;
    host.services.enable(&file_name)?;

    info!(unit = %file_name, path = %path.display(), "service unit installed and enabled");
    Ok(ActivationOutcome::Registered)
}

fn deactivate_service(unit: &ServiceUnit, host: &AutostartHost<'_>) -> AutostartResult<DeactivationOutcome> {
    let path = unit.path_in(&host.unit_dir);
    if !path.exists() {
        return Ok(DeactivationOutcome::NotPresent);
    }

    require_elevated(host, "removing a systemd unit")?;
    require_systemd(host)?;

    let file_name = unit.file_name();
    if let Err(e) = host.services.disable(&file_name) {
        warn!(unit = %file_name, error = %e, "disable failed, removing unit anyway");
    }
    std::fs::remove_file(&path)?;
    host.services.daemon_reload()?;

    info!(unit = %file_name, "service unit removed");
    Ok(DeactivationOutcome::Removed)
}

fn activate_job(job: &ScheduledJob, host: &AutostartHost<'_>) -> AutostartResult<ActivationOutcome> {
    require_crontab(host)?;

    // Rewrite the script every time so it tracks the current binary path.
    job.script.write_to(&job.script_path)?;

    let current = host.crontab.read()?;
    match job.with_entry(&current) {
        None => {
            info!(entry = %job.entry_line(), "crontab entry already present");
            Ok(ActivationOutcome::AlreadyRegistered)
        }
        Some(updated) => {
            host.crontab.write(&updated)?;
            info!(entry = %job.entry_line(), "crontab entry added");
            Ok(ActivationOutcome::Registered)
        }
    }
}

fn deactivate_job(job: &ScheduledJob, host: &AutostartHost<'_>) -> AutostartResult<DeactivationOutcome> {
    require_crontab(host)?;

    let current = host.crontab.read()?;
    let outcome = match job.without_entry(&current) {
        None => DeactivationOutcome::NotPresent,
        Some(updated) => {
            host.crontab.write(&updated)?;
            DeactivationOutcome::Removed
        }
    };

    if job.script_path.exists() {
        std::fs::remove_file(&job.script_path)?;
    }
    Ok(outcome)
}

fn service_state(unit: &ServiceUnit, host: &AutostartHost<'_>) -> ServiceState {
    if !unit.path_in(&host.unit_dir).exists() {
        return ServiceState::NotInstalled;
    }
    let file_name = unit.file_name();
    if host.services.is_active(&file_name) {
        ServiceState::Running
    } else if host.services.is_enabled(&file_name) {
        ServiceState::Enabled
    } else {
        ServiceState::Installed
    }
}

fn job_state(job: &ScheduledJob, host: &AutostartHost<'_>) -> JobState {
    match host.crontab.read() {
        Ok(crontab) if job.is_registered_in(&crontab) => JobState::Registered,
        _ => JobState::NotRegistered,
    }
}

/// State of both variants for one project.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutostartStatus {
    pub service: ServiceState,
    pub cron: JobState,
}

impl AutostartStatus {
    /// Both variants would start the supervisor at boot.
    pub fn conflicting(&self) -> bool {
        self.service >= ServiceState::Enabled && self.cron == JobState::Registered
    }
}

/// Both registrations for a project plus the host they act on.
pub struct Registrar<'a> {
    service: AutostartRegistration,
    job: AutostartRegistration,
    host: AutostartHost<'a>,
}

impl<'a> Registrar<'a> {
    pub fn new(service: ServiceUnit, job: ScheduledJob, host: AutostartHost<'a>) -> Self {
        Self {
            service: AutostartRegistration::ServiceUnit(service),
            job: AutostartRegistration::ScheduledJob(job),
            host,
        }
    }

    pub fn registration(&self, variant: Variant) -> &AutostartRegistration {
        match variant {
            Variant::Service => &self.service,
            Variant::Cron => &self.job,
        }
    }

    /// Activate `variant`. With `exclusive`, the other variant is deactivated
    /// afterwards if it is active.
    pub fn activate(&self, variant: Variant, exclusive: bool) -> AutostartResult<ActivationOutcome> {
        let outcome = self.registration(variant).activate(&self.host)?;

        let other = self.registration(other_variant(variant));
        if other.is_active(&self.host) {
            if exclusive {
                other.deactivate(&self.host)?;
                info!(kept = %variant, removed = %other.variant(), "deactivated competing autostart");
            } else {
                warn!(
                    active = %other.variant(),
                    "both autostart variants are active; the second start is skipped by the instance guard"
                );
            }
        }

        Ok(outcome)
    }

    pub fn deactivate(&self, variant: Variant) -> AutostartResult<DeactivationOutcome> {
        self.registration(variant).deactivate(&self.host)
    }

    pub fn status(&self) -> AutostartStatus {
        let service = match &self.service {
            AutostartRegistration::ServiceUnit(unit) => service_state(unit, &self.host),
            AutostartRegistration::ScheduledJob(_) => ServiceState::NotInstalled,
        };
        let cron = match &self.job {
            AutostartRegistration::ScheduledJob(job) => job_state(job, &self.host),
            AutostartRegistration::ServiceUnit(_) => JobState::NotRegistered,
        };
        AutostartStatus { service, cron }
    }

    /// Start the service unit now. Only meaningful for the service variant;
    /// the cron variant is started by running the launcher directly.
    pub fn start_service(&self) -> AutostartResult<()> {
        if let AutostartRegistration::ServiceUnit(unit) = &self.service {
            require_elevated(&self.host, "starting a systemd unit")?;
            self.host.services.start(&unit.file_name())?;
            info!(unit = %unit.file_name(), "service started");
        }
        Ok(())
    }
}

fn other_variant(variant: Variant) -> Variant {
    match variant {
        Variant::Service => Variant::Cron,
        Variant::Cron => Variant::Service,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{RestartPolicy, WrapperScript};
    use parking_lot::Mutex;
    use std::path::Path;
    use tempfile::{tempdir, TempDir};

    #[derive(Default)]
    struct FakeSystemd {
        missing: bool,
        enabled: Mutex<Vec<String>>,
        active: Mutex<Vec<String>>,
        reloads: Mutex<u32>,
    }

    impl ServiceManager for FakeSystemd {
        fn is_available(&self) -> bool {
            !self.missing
        }
        fn daemon_reload(&self) -> AutostartResult<()> {
            *self.reloads.lock() += 1;
            Ok(())
        }
        fn enable(&self, unit: &str) -> AutostartResult<()> {
            self.enabled.lock().push(unit.to_string());
            Ok(())
        }
        fn disable(&self, unit: &str) -> AutostartResult<()> {
            self.enabled.lock().retain(|u| u != unit);
            Ok(())
        }
        fn start(&self, unit: &str) -> AutostartResult<()> {
            self.active.lock().push(unit.to_string());
            Ok(())
        }
        fn is_enabled(&self, unit: &str) -> bool {
            self.enabled.lock().iter().any(|u| u == unit)
        }
        fn is_active(&self, unit: &str) -> bool {
            self.active.lock().iter().any(|u| u == unit)
        }
    }

    #[derive(Default)]
    struct FakeCrontab {
        content: Mutex<String>,
        writes: Mutex<u32>,
    }

    impl CrontabStore for FakeCrontab {
        fn is_available(&self) -> bool {
            true
        }
        fn read(&self) -> AutostartResult<String> {
            Ok(self.content.lock().clone())
        }
        fn write(&self, content: &str) -> AutostartResult<()> {
            *self.content.lock() = content.to_string();
            *self.writes.lock() += 1;
            Ok(())
        }
    }

    fn service_unit(project: &Path) -> ServiceUnit {
        ServiceUnit {
            name: "bot-supervisor".into(),
            description: "Bot supervisor".into(),
            working_dir: project.to_path_buf(),
            exec_start: vec!["/usr/local/bin/bot-supervisor".into(), "launch".into()],
            restart: RestartPolicy { delay_secs: 10 },
            stdout_log: project.join("logs/bot.log"),
            stderr_log: project.join("logs/bot_error.log"),
            user: None,
        }
    }

    fn scheduled_job(project: &Path) -> ScheduledJob {
        ScheduledJob {
            script_path: project.join("data/autostart-cron.sh"),
            script: WrapperScript {
                project_dir: project.to_path_buf(),
                supervisor_exe: "/usr/local/bin/bot-supervisor".into(),
                stdout_log: project.join("logs/cron_bot.log"),
                stderr_log: project.join("logs/cron_bot_error.log"),
                path_env: None,
            },
        }
    }

    struct Fixture {
        dir: TempDir,
        systemd: FakeSystemd,
        crontab: FakeCrontab,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                dir: tempdir().unwrap(),
                systemd: FakeSystemd::default(),
                crontab: FakeCrontab::default(),
            }
        }

        fn registrar(&self, elevated: bool) -> Registrar<'_> {
            let project = self.dir.path().join("project");
            Registrar::new(
                service_unit(&project),
                scheduled_job(&project),
                AutostartHost {
                    services: &self.systemd,
                    crontab: &self.crontab,
                    unit_dir: self.dir.path().join("units"),
                    elevated,
                },
            )
        }

        fn unit_path(&self) -> PathBuf {
            self.dir.path().join("units").join("bot-supervisor.service")
        }
    }

    #[test]
    fn cron_registration_twice_leaves_one_line() {
        let fx = Fixture::new();
        *fx.crontab.content.lock() = "0 3 * * * /usr/bin/backup\n".to_string();
        let registrar = fx.registrar(false);

        assert_eq!(
            registrar.activate(Variant::Cron, false).unwrap(),
            ActivationOutcome::Registered
        );
        assert_eq!(
            registrar.activate(Variant::Cron, false).unwrap(),
            ActivationOutcome::AlreadyRegistered
        );

        let crontab = fx.crontab.content.lock().clone();
        assert_eq!(crontab.matches("@reboot").count(), 1);
        assert!(crontab.starts_with("0 3 * * * /usr/bin/backup\n"));
        assert_eq!(*fx.crontab.writes.lock(), 1);
        assert!(fx.dir.path().join("project/data/autostart-cron.sh").exists());
        assert_eq!(registrar.status().cron, JobState::Registered);
    }

    #[test]
    fn service_install_requires_root() {
        let fx = Fixture::new();
        let registrar = fx.registrar(false);
        assert!(matches!(
            registrar.activate(Variant::Service, false),
            Err(AutostartError::Permission { .. })
        ));
        assert!(!fx.unit_path().exists());
    }

    #[test]
    fn service_install_requires_systemctl() {
        let mut fx = Fixture::new();
        fx.systemd.missing = true;
        let registrar = fx.registrar(true);
        assert!(matches!(
            registrar.activate(Variant::Service, false),
            Err(AutostartError::MissingDependency { .. })
        ));
    }

    #[test]
    fn service_lifecycle_walks_through_states() {
        let fx = Fixture::new();
        let registrar = fx.registrar(true);
        assert_eq!(registrar.status().service, ServiceState::NotInstalled);

        assert_eq!(
            registrar.activate(Variant::Service, false).unwrap(),
            ActivationOutcome::Registered
        );
        assert!(fx.unit_path().exists());
        assert_eq!(*fx.systemd.reloads.lock(), 1);
        assert_eq!(registrar.status().service, ServiceState::Enabled);

        assert_eq!(
            registrar.activate(Variant::Service, false).unwrap(),
            ActivationOutcome::AlreadyRegistered
        );
        assert_eq!(*fx.systemd.reloads.lock(), 1);

        registrar.start_service().unwrap();
        assert_eq!(registrar.status().service, ServiceState::Running);
    }

    #[test]
    fn installed_but_not_enabled_unit_is_reported() {
        let fx = Fixture::new();
        let registrar = fx.registrar(true);
        registrar.activate(Variant::Service, false).unwrap();
        fx.systemd.disable("bot-supervisor.service").unwrap();
        assert_eq!(registrar.status().service, ServiceState::Installed);
    }

    #[test]
    fn exclusive_activation_removes_the_other_variant() {
        let fx = Fixture::new();
        let registrar = fx.registrar(true);

        registrar.activate(Variant::Cron, false).unwrap();
        registrar.activate(Variant::Service, false).unwrap();
        assert!(registrar.status().conflicting());

        registrar.activate(Variant::Service, true).unwrap();
        let status = registrar.status();
        assert_eq!(status.cron, JobState::NotRegistered);
        assert_eq!(status.service, ServiceState::Enabled);
        assert!(!status.conflicting());
    }

    #[test]
    fn deactivate_is_idempotent() {
        let fx = Fixture::new();
        let registrar = fx.registrar(true);

        assert_eq!(
            registrar.deactivate(Variant::Service).unwrap(),
            DeactivationOutcome::NotPresent
        );
        assert_eq!(
            registrar.deactivate(Variant::Cron).unwrap(),
            DeactivationOutcome::NotPresent
        );

        registrar.activate(Variant::Service, false).unwrap();
        assert_eq!(
            registrar.deactivate(Variant::Service).unwrap(),
            DeactivationOutcome::Removed
        );
        assert!(!fx.unit_path().exists());
        assert!(!fx.systemd.is_enabled("bot-supervisor.service"));
    }

    #[test]
    fn variant_names() {
        assert_eq!(Variant::Service.to_string(), "service");
        assert_eq!(other_variant(Variant::Cron), Variant::Service);
        assert_eq!(
            AutostartRegistration::ScheduledJob(scheduled_job(Path::new("/srv/bot"))).variant(),
            Variant::Cron
        );
    }
}
