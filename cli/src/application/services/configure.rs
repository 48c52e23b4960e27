//! Configuration flow. Turns a [`SetupRequest`] into a validated, confirmed
//! [`Configuration`].
//!
//! ```text
//! ModeSelection ─┬─ WizardFill ───────┬─ RegistrationDecision ─ ConfirmationGate
//!                └─ ArgumentValidate ─┘
//! ```
//!
//! Nothing on the host is modified here; declining the confirmation leaves
//! the system untouched.

use std::path::Path;

use anyhow::Result;
use caasp_common::Flavor;
use tracing::info;

use crate::application::ports::{ProgressReporter, Prompter, SystemFs};
use crate::application::services::input::{
    PemKind, ask_path_until_valid, ask_until_valid, check_pem_file, confirm,
};
use crate::application::services::poll::PollPolicy;
use crate::domain::{
    CertificateSource, Configuration, Mode, Registration, SetupError, SetupRequest,
    ValidationResult, normalize_email, validate_email, validate_password,
};

/// Values used when the operator does not provide their own.
#[derive(Debug, Clone)]
pub struct FlowDefaults {
    /// `caasp-admin@<fqdn>`.
    pub admin_email: String,
    /// The platform instance ID.
    pub admin_password: String,
}

/// Inputs of the configuration flow that do not come from the operator.
pub struct FlowOptions<'a> {
    pub flavor: Flavor,
    pub defaults: &'a FlowDefaults,
    /// Sampling used while waiting for certificate uploads to settle.
    pub stability: &'a PollPolicy,
}

/// Run the flow up to and including the confirmation gate.
///
/// # Errors
///
/// - `SetupError::InvalidArgument` when a flag value fails validation.
/// - `SetupError::Aborted` when the operator declines the summary.
/// - Any prompter failure (no TTY, closed stdin).
pub async fn resolve_configuration(
    request: &SetupRequest,
    opts: &FlowOptions<'_>,
    prompter: &impl Prompter,
    fs: &impl SystemFs,
    reporter: &impl ProgressReporter,
) -> Result<Configuration> {
    let mode = request.mode();
    info!(target: "audit", ?mode, "configuration mode selected");

    let (certificate, admin_email, admin_password) = match mode {
        Mode::Wizard => wizard_fill(request, opts, prompter, fs, reporter).await?,
        Mode::Arguments => validate_arguments(request, opts, fs).await?,
    };
    let registration = decide_registration(request, mode, opts.flavor, prompter, reporter)?;

    let config = Configuration {
        certificate,
        admin_email,
        admin_password,
        registration,
        accept: request.accept,
    };
    confirmation_gate(&config, prompter, reporter)?;
    Ok(config)
}

type Fields = (CertificateSource, String, String);

async fn wizard_fill(
    request: &SetupRequest,
    opts: &FlowOptions<'_>,
    prompter: &impl Prompter,
    fs: &impl SystemFs,
    reporter: &impl ProgressReporter,
) -> Result<Fields> {
    let warn = |msg: &str| reporter.warn(msg);

    let certificate = if confirm(prompter, "Do you want to use your own SSL certificate?", false)? {
        let crt = ask_path_until_valid(
            prompter,
            "Path to the SSL certificate",
            move |path| async move {
                check_pem_file(fs, Path::new(&path), PemKind::Certificate, opts.stability).await
            },
            warn,
        )
        .await?;
        let key = ask_path_until_valid(
            prompter,
            "Path to the SSL key",
            move |path| async move {
                check_pem_file(fs, Path::new(&path), PemKind::PrivateKey, opts.stability).await
            },
            warn,
        )
        .await?;
        CertificateSource::Provided {
            crt: crt.into(),
            key: key.into(),
        }
    } else {
        info!(target: "audit", "self-signed certificate requested");
        CertificateSource::SelfSigned
    };

    let email_default = request
        .admin_email
        .as_deref()
        .unwrap_or(opts.defaults.admin_email.as_str());
    let admin_email = ask_until_valid(
        prompter,
        "Administrator e-mail",
        email_default,
        false,
        validate_email,
        warn,
    )
    .map(bare_email)?;

    let password_default = request
        .admin_password
        .as_deref()
        .unwrap_or(opts.defaults.admin_password.as_str());
    let admin_password = ask_until_valid(
        prompter,
        "Administrator password",
        password_default,
        true,
        validate_password,
        warn,
    )?;

    Ok((certificate, admin_email, admin_password))
}

async fn validate_arguments(
    request: &SetupRequest,
    opts: &FlowOptions<'_>,
    fs: &impl SystemFs,
) -> Result<Fields> {
    let certificate = match (&request.ssl_crt, &request.ssl_key) {
        (Some(crt), Some(key)) => {
            check_pem_file(fs, crt, PemKind::Certificate, opts.stability)
                .await
                .require("--ssl-crt")?;
            check_pem_file(fs, key, PemKind::PrivateKey, opts.stability)
                .await
                .require("--ssl-key")?;
            CertificateSource::Provided {
                crt: crt.clone(),
                key: key.clone(),
            }
        }
        _ => CertificateSource::SelfSigned,
    };

    let admin_email = request
        .admin_email
        .clone()
        .unwrap_or_else(|| opts.defaults.admin_email.clone());
    validate_email(&admin_email).require("--admin-email")?;
    let admin_email = bare_email(admin_email);

    let admin_password = request
        .admin_password
        .clone()
        .unwrap_or_else(|| opts.defaults.admin_password.clone());
    validate_password(&admin_password).require("--admin-password")?;

    Ok((certificate, admin_email, admin_password))
}

/// The bare address of an already validated mailbox, so display names never
/// reach the dashboard or the registration service.
fn bare_email(raw: String) -> String {
    normalize_email(&raw).unwrap_or(raw)
}

fn decide_registration(
    request: &SetupRequest,
    mode: Mode,
    flavor: Flavor,
    prompter: &impl Prompter,
    reporter: &impl ProgressReporter,
) -> Result<Option<Registration>> {
    if !flavor.requires_registration() {
        return Ok(None);
    }
    match mode {
        Mode::Arguments => {
            let Some(reg) = request.registration() else {
                return Ok(None);
            };
            validate_email(&reg.email).require("--reg-email")?;
            Ok(Some(Registration {
                email: bare_email(reg.email),
                ..reg
            }))
        }
        Mode::Wizard => {
            if !confirm(
                prompter,
                "Do you want to register this node for updates?",
                true,
            )? {
                return Ok(None);
            }
            let warn = |msg: &str| reporter.warn(msg);
            let email = ask_until_valid(
                prompter,
                "Registration e-mail",
                request.reg_email.as_deref().unwrap_or_default(),
                false,
                validate_email,
                warn,
            )
            .map(bare_email)?;
            let code = ask_until_valid(
                prompter,
                "Registration code",
                request.reg_code.as_deref().unwrap_or_default(),
                true,
                |code| {
                    ValidationResult::new(
                        !code.trim().is_empty(),
                        "Registration code provided",
                        "Registration code must not be empty",
                    )
                },
                warn,
            )?;
            Ok(Some(Registration { email, code }))
        }
    }
}

fn confirmation_gate(
    config: &Configuration,
    prompter: &impl Prompter,
    reporter: &impl ProgressReporter,
) -> Result<()> {
    if config.accept {
        info!(target: "audit", "confirmation skipped (--accept)");
        return Ok(());
    }
    for (label, value) in config.summary() {
        reporter.detail(label, &value);
    }
    if confirm(prompter, "Apply this configuration?", false)? {
        Ok(())
    } else {
        Err(SetupError::Aborted.into())
    }
}
