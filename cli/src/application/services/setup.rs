//! End-to-end admin node setup.
//!
//! Preconditions, configuration flow, provisioning, readiness waits and
//! account creation, in that order. Stops at the first fatal error; there is
//! no rollback.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.

use anyhow::{Context, Result};
use caasp_common::SetupSettings;
use tracing::{info, warn};

use crate::application::ports::{
    CommandRunner, ConfigMaster, ContainerRuntime, HostFacts, Platform, ProgressReporter,
    Prompter, SystemFs,
};
use crate::application::services::account::{
    create_admin_account, write_pillar_file, write_pillars,
};
use crate::application::services::configure::{FlowDefaults, FlowOptions, resolve_configuration};
use crate::application::services::input::default_stability_policy;
use crate::application::services::poll::PollPolicy;
use crate::application::services::provision::{
    activate, configure_etcd, enable_services, initialize_platform, install_certificates,
    register, write_deploy_script,
};
use crate::application::services::readiness::{wait_for_dashboard, wait_for_salt_master};
use crate::domain::config::default_admin_email;
use crate::domain::host::certificate_fingerprint;
use crate::domain::pillar::cluster_pillars;
use crate::domain::{RegistrationOutcome, SetupError, SetupRequest};

/// Every collaborator setup talks to.
pub struct SetupPorts<'a, P, C, M, R, F, H, Q, W> {
    pub platform: &'a P,
    pub containers: &'a C,
    pub master: &'a M,
    pub runner: &'a R,
    pub fs: &'a F,
    pub host: &'a H,
    pub prompter: &'a Q,
    pub reporter: &'a W,
}

/// Wait budgets.
#[derive(Debug, Clone, Copy)]
pub struct Timings {
    /// Dashboard container, dashboard database and salt master.
    pub readiness: PollPolicy,
    /// Certificate uploads settling.
    pub file_stability: PollPolicy,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            readiness: PollPolicy::default(),
            file_stability: default_stability_policy(),
        }
    }
}

/// What a finished setup reports back to the operator.
#[derive(Debug, Clone)]
pub struct SetupReport {
    /// Host name nodes reach the dashboard under.
    pub fqdn: String,
    /// Host name operators reach the dashboard under.
    pub external_fqdn: String,
    pub admin_email: String,
    pub registration: RegistrationOutcome,
    /// SHA-256 fingerprint of the generated certificate, when self-signed.
    pub fingerprint: Option<String>,
}

/// Root, memory and cloud permissions, in that order.
///
/// # Errors
///
/// Returns `SetupError::Precondition` for the first unmet requirement.
pub async fn check_preconditions(
    host: &impl HostFacts,
    platform: &impl Platform,
    settings: &SetupSettings,
) -> Result<()> {
    if !host.is_root() {
        return Err(SetupError::Precondition("caasp-admin-setup must be run as root".into()).into());
    }
    let mem = host.mem_total_kib().context("reading host memory")?;
    if mem < settings.min_memory_kib {
        return Err(SetupError::Precondition(format!(
            "admin node needs at least {} KiB of memory, found {mem} KiB",
            settings.min_memory_kib
        ))
        .into());
    }
    if !platform
        .have_permissions()
        .await
        .context("checking cloud permissions")?
    {
        return Err(SetupError::Precondition(format!(
            "this instance lacks the {} permissions needed to manage cluster nodes",
            platform.provider()
        ))
        .into());
    }
    info!(target: "audit", mem_total_kib = mem, "preconditions met");
    Ok(())
}

/// The dashboard's outside name: the configured one, else the platform's
/// public hostname, else `fqdn`.
pub async fn resolve_external_fqdn(
    platform: &impl Platform,
    settings: &SetupSettings,
    fqdn: &str,
) -> String {
    if let Some(name) = settings.external_fqdn.as_deref().filter(|n| !n.trim().is_empty()) {
        return name.trim().to_string();
    }
    match platform.get_public_hostname().await {
        Ok(Some(name)) => name,
        Ok(None) => fqdn.to_string(),
        Err(e) => {
            warn!(error = %e, "public hostname lookup failed, using {fqdn}");
            fqdn.to_string()
        }
    }
}

/// Run the whole setup.
///
/// # Errors
///
/// Returns the first fatal [`SetupError`] (or context-wrapped I/O error).
/// Registration failures are not fatal.
pub async fn run_setup<P, C, M, R, F, H, Q, W>(
    request: &SetupRequest,
    settings: &SetupSettings,
    timings: &Timings,
    ports: &SetupPorts<'_, P, C, M, R, F, H, Q, W>,
) -> Result<SetupReport>
where
    P: Platform,
    C: ContainerRuntime,
    M: ConfigMaster,
    R: CommandRunner,
    F: SystemFs,
    H: HostFacts,
    Q: Prompter,
    W: ProgressReporter,
{
    info!(target: "audit", provider = %ports.platform.provider(), flavor = %settings.flavor, "setup started");
    check_preconditions(ports.host, ports.platform, settings).await?;

    let fqdn = ports.host.fqdn().await.context("resolving host name")?;
    let instance_id = ports
        .platform
        .get_instance_id()
        .await
        .context("reading instance id")?;
    let defaults = FlowDefaults {
        admin_email: default_admin_email(&fqdn),
        admin_password: instance_id,
    };
    let opts = FlowOptions {
        flavor: settings.flavor,
        defaults: &defaults,
        stability: &timings.file_stability,
    };
    let config =
        resolve_configuration(request, &opts, ports.prompter, ports.fs, ports.reporter).await?;
    info!(target: "audit", admin_email = %config.admin_email, self_signed = config.self_signed(), "configuration accepted");

    let ip = ports
        .platform
        .get_local_ipv4()
        .await
        .context("reading local IPv4 address")?;
    let external_fqdn = resolve_external_fqdn(ports.platform, settings, &fqdn).await;
    info!(target: "audit", %fqdn, %external_fqdn, "dashboard names resolved");

    // Provisioning
    install_certificates(&config, settings, ports.fs, ports.reporter)?;
    let registration = register(
        config.registration.as_ref(),
        &settings.registration_command,
        ports.runner,
        ports.reporter,
    )
    .await;
    write_deploy_script(config.registration.as_ref(), &registration, settings, ports.fs)?;
    configure_etcd(ip, &settings.paths.etcd_config, ports.fs)?;
    initialize_platform(ports.platform, settings, ip, ports.fs, ports.reporter).await?;
    activate(settings, ports.runner, ports.reporter).await?;
    enable_services(&settings.services, ports.runner, ports.reporter).await?;

    // Readiness
    let container = wait_for_dashboard(
        ports.containers,
        &settings.dashboard,
        &timings.readiness,
        ports.reporter,
    )
    .await?;
    wait_for_salt_master(
        ports.master,
        &settings.master_query,
        &timings.readiness,
        ports.reporter,
    )
    .await?;

    // Account and pillars
    ports.reporter.step("creating the dashboard administrator...");
    create_admin_account(
        ports.containers,
        &container,
        &settings.dashboard,
        &config.admin_email,
        &config.admin_password,
    )
    .await?;
    let registered = registration.is_registered();
    let pillars = cluster_pillars(
        &fqdn,
        &external_fqdn,
        ports.platform.provider(),
        settings.flavor,
        registered,
    );
    write_pillars(ports.containers, &container, &settings.dashboard, &pillars).await?;
    write_pillar_file(
        ports.platform,
        settings,
        &fqdn,
        &external_fqdn,
        registered,
        ports.fs,
    )
    .await?;
    ports.reporter.success("dashboard administrator and pillars created");

    ports
        .fs
        .write_atomic(&settings.paths.motd, settings.banner.as_bytes(), 0o644)
        .context("restoring login banner")?;

    let fingerprint = if config.self_signed() {
        ports
            .fs
            .read(&settings.paths.ssl_crt)
            .ok()
            .and_then(|pem| certificate_fingerprint(&pem))
    } else {
        None
    };
    info!(target: "audit", ?fingerprint, "setup finished");

    Ok(SetupReport {
        fqdn,
        external_fqdn,
        admin_email: config.admin_email,
        registration,
        fingerprint,
    })
}
