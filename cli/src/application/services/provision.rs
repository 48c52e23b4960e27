//! Provisioning steps: TLS material, registration, etcd, platform init,
//! activation and services.
//!
//! Every step is safe to repeat on a re-run. There is no rollback: a failed
//! step leaves the host as far as it got.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.

use std::net::Ipv4Addr;
use std::path::Path;
use std::process::Output;
use std::time::Duration;

use anyhow::{Context, Result};
use caasp_common::SetupSettings;
use tracing::{info, warn};

use crate::application::ports::{
    CommandRunner, Platform, ProgressReporter, SaltCloudContext, SystemFs,
};
use crate::domain::registration::{find_error_line, render_deploy_script};
use crate::domain::sysconfig::set_etcd_client_urls;
use crate::domain::{CertificateSource, Configuration, Registration, RegistrationOutcome, SetupError};

/// Limit for the activation script, which pulls and starts the control plane.
pub const ACTIVATION_TIMEOUT: Duration = Duration::from_secs(900);

/// Limit for a single `systemctl` call.
pub const SYSTEMCTL_TIMEOUT: Duration = Duration::from_secs(300);

/// Run a program and turn a non-zero exit into [`SetupError::CommandFailed`].
///
/// # Errors
///
/// Returns an error if the program cannot be spawned, times out, or exits
/// unsuccessfully.
pub async fn run_checked(
    runner: &impl CommandRunner,
    program: &str,
    args: &[&str],
    timeout: Duration,
) -> Result<Output> {
    let output = runner
        .run_with_timeout(program, args, timeout)
        .await
        .with_context(|| format!("running {program}"))?;
    if !output.status.success() {
        let command = std::iter::once(program)
            .chain(args.iter().copied())
            .collect::<Vec<_>>()
            .join(" ");
        return Err(SetupError::command_failed(&command, output.status, &output.stderr).into());
    }
    Ok(output)
}

/// Install the operator's certificate pair, or leave generation to activation.
///
/// # Errors
///
/// Returns an error if either file cannot be installed.
pub fn install_certificates(
    config: &Configuration,
    settings: &SetupSettings,
    fs: &impl SystemFs,
    reporter: &impl ProgressReporter,
) -> Result<()> {
    match &config.certificate {
        CertificateSource::Provided { crt, key } => {
            reporter.step("installing SSL certificate...");
            fs.install_private(crt, &settings.paths.ssl_crt)
                .context("installing SSL certificate")?;
            fs.install_private(key, &settings.paths.ssl_key)
                .context("installing SSL key")?;
            info!(target: "audit", crt = %settings.paths.ssl_crt.display(), "SSL certificate installed");
            reporter.success("SSL certificate installed");
        }
        CertificateSource::SelfSigned => {
            info!(target: "audit", "SSL certificate will be generated during activation");
        }
    }
    Ok(())
}

/// Register the node with the update service.
///
/// Never fails: a tool error is reported as a warning and setup continues
/// without registration.
pub async fn register(
    registration: Option<&Registration>,
    tool: &str,
    runner: &impl CommandRunner,
    reporter: &impl ProgressReporter,
) -> RegistrationOutcome {
    let Some(reg) = registration else {
        info!(target: "audit", "registration skipped");
        return RegistrationOutcome::Skipped;
    };
    reporter.step("registering with the update service...");
    let outcome = match runner.run(tool, &["-e", &reg.email, "-r", &reg.code]).await {
        Ok(output) => {
            let stdout = String::from_utf8_lossy(&output.stdout);
            let stderr = String::from_utf8_lossy(&output.stderr);
            if let Some(line) = find_error_line(&stdout, &stderr) {
                RegistrationOutcome::Failed {
                    reason: line.to_string(),
                }
            } else if output.status.success() {
                RegistrationOutcome::Registered
            } else {
                RegistrationOutcome::Failed {
                    reason: format!("{tool} exited with {}", output.status),
                }
            }
        }
        Err(e) => RegistrationOutcome::Failed {
            reason: format!("{e:#}"),
        },
    };
    match &outcome {
        RegistrationOutcome::Failed { reason } => {
            warn!(target: "audit", %reason, "registration failed, continuing without it");
            reporter.warn(&format!(
                "registration failed ({reason}); continuing without registration"
            ));
        }
        _ => {
            info!(target: "audit", email = %reg.email, "registered");
            reporter.success("registered with the update service");
        }
    }
    outcome
}

/// Write the node deploy script, embedding the registration options only
/// when registration succeeded.
///
/// # Errors
///
/// Returns an error if the script cannot be written.
pub fn write_deploy_script(
    registration: Option<&Registration>,
    outcome: &RegistrationOutcome,
    settings: &SetupSettings,
    fs: &impl SystemFs,
) -> Result<()> {
    let registration = registration.filter(|_| outcome.is_registered());
    let script = render_deploy_script(registration, &settings.registration_command);
    fs.write_atomic(&settings.paths.deploy_script, script.as_bytes(), 0o600)
        .context("writing deploy script")?;
    info!(target: "audit", path = %settings.paths.deploy_script.display(), "deploy script written");
    Ok(())
}

/// Advertise etcd's client endpoint on `ip`.
///
/// # Errors
///
/// Returns an error if the configuration cannot be read or written.
pub fn configure_etcd(ip: Ipv4Addr, path: &Path, fs: &impl SystemFs) -> Result<()> {
    let current = if fs.exists(path) {
        let bytes = fs.read(path)?;
        String::from_utf8(bytes).with_context(|| format!("{} is not UTF-8", path.display()))?
    } else {
        String::new()
    };
    let updated = set_etcd_client_urls(&current, ip);
    fs.write_atomic(path, updated.as_bytes(), 0o644)
        .context("writing etcd configuration")?;
    info!(target: "audit", %ip, "etcd client URLs configured");
    Ok(())
}

/// Platform-specific cluster initialization: salt-cloud key, network
/// security rules, and the salt-cloud provider and profile documents.
///
/// # Errors
///
/// Returns an error if any platform call or file write fails.
pub async fn initialize_platform(
    platform: &impl Platform,
    settings: &SetupSettings,
    ip: Ipv4Addr,
    fs: &impl SystemFs,
    reporter: &impl ProgressReporter,
) -> Result<()> {
    reporter.step(&format!("initializing {} platform...", platform.provider()));
    let public_key = platform
        .create_public_key(&settings.paths.salt_cloud_key)
        .await
        .context("creating salt-cloud key pair")?;
    info!(target: "audit", public_key = %public_key.trim(), "salt-cloud key pair ready");

    platform
        .setup_network_security()
        .await
        .context("setting up network security")?;

    let script = settings
        .paths
        .deploy_script
        .file_stem()
        .and_then(|s| s.to_str())
        .context("deploy script path has no file name")?;
    let ctx = SaltCloudContext {
        private_key: &settings.paths.salt_cloud_key,
        master_ipv4: ip,
        script,
    };
    let provider = platform.get_salt_cloud_provider_config(&ctx).await?;
    fs.write_atomic(
        &settings.paths.salt_cloud_providers,
        serde_yaml::to_string(&provider)?.as_bytes(),
        0o600,
    )
    .context("writing salt-cloud provider configuration")?;
    let profile = platform.get_salt_cloud_profile_config(&ctx).await?;
    fs.write_atomic(
        &settings.paths.salt_cloud_profiles,
        serde_yaml::to_string(&profile)?.as_bytes(),
        0o644,
    )
    .context("writing salt-cloud profile configuration")?;

    reporter.success("platform initialized");
    Ok(())
}

/// Run the activation script.
///
/// # Errors
///
/// Returns an error if the script is not configured or fails.
pub async fn activate(
    settings: &SetupSettings,
    runner: &impl CommandRunner,
    reporter: &impl ProgressReporter,
) -> Result<()> {
    let Some((program, args)) = settings.activation_command.split_first() else {
        anyhow::bail!("no activation command configured");
    };
    reporter.step("activating admin node services...");
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    run_checked(runner, program, &args, ACTIVATION_TIMEOUT).await?;
    info!(target: "audit", %program, "activation finished");
    reporter.success("admin node activated");
    Ok(())
}

/// Enable and start each unit in order.
///
/// # Errors
///
/// Returns `SetupError::CommandFailed` for the first unit that fails.
pub async fn enable_services(
    services: &[String],
    runner: &impl CommandRunner,
    reporter: &impl ProgressReporter,
) -> Result<()> {
    for service in services {
        reporter.step(&format!("starting {service}..."));
        run_checked(runner, "systemctl", &["enable", service], SYSTEMCTL_TIMEOUT).await?;
        run_checked(runner, "systemctl", &["start", service], SYSTEMCTL_TIMEOUT).await?;
        info!(target: "audit", %service, "service enabled and started");
        reporter.success(&format!("{service} started"));
    }
    Ok(())
}
