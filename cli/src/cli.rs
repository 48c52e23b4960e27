//! CLI argument parsing with clap derive

use std::path::PathBuf;

use anyhow::Result;
use caasp_common::config::DEFAULT_SETTINGS_PATH;
use caasp_common::{CloudProvider, Flavor, SetupSettings};
use clap::Parser;

use crate::app::{AppContext, OutputFlags, SettingsOverrides};
use crate::commands;
use crate::domain::SetupRequest;

/// Configure a CaaSP admin node: TLS material, registration, services and
/// the dashboard administrator.
///
/// Without a certificate pair or --gen-ssl, an interactive wizard asks for
/// every value.
#[derive(Parser)]
#[command(name = "caasp-admin-setup", version)]
pub struct Cli {
    /// SSL certificate for the dashboard (PEM)
    #[arg(long, value_name = "PATH")]
    pub ssl_crt: Option<PathBuf>,

    /// Private key matching --ssl-crt (PEM)
    #[arg(long, value_name = "PATH")]
    pub ssl_key: Option<PathBuf>,

    /// Generate a self-signed certificate
    #[arg(long, conflicts_with_all = ["ssl_crt", "ssl_key"])]
    pub gen_ssl: bool,

    /// Dashboard administrator e-mail [default: caasp-admin@<fqdn>]
    #[arg(long, value_name = "EMAIL")]
    pub admin_email: Option<String>,

    /// Dashboard administrator password [default: instance id]
    #[arg(long, value_name = "PASSWORD")]
    pub admin_password: Option<String>,

    /// E-mail address for update registration
    #[arg(long, value_name = "EMAIL")]
    pub reg_email: Option<String>,

    /// Registration code for update registration
    #[arg(long, value_name = "CODE")]
    pub reg_code: Option<String>,

    /// Apply the configuration without asking for confirmation
    #[arg(short = 'y', long)]
    pub accept: bool,

    /// Ask for every value interactively
    #[arg(long)]
    pub wizard: bool,

    /// Procurement flavor (overrides the settings file)
    #[arg(long, value_enum)]
    pub flavor: Option<Flavor>,

    /// Cloud provider (overrides the settings file)
    #[arg(long, value_enum)]
    pub provider: Option<CloudProvider>,

    /// Settings file
    #[arg(long, value_name = "PATH", env = "CAASP_SETUP_CONFIG", default_value = DEFAULT_SETTINGS_PATH)]
    pub settings: PathBuf,

    /// Audit log file (overrides the settings file)
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, env = "NO_COLOR")]
    pub no_color: bool,
}

impl Cli {
    /// Split the flags into the setup request, settings overrides and output
    /// flags.
    #[must_use]
    pub fn into_parts(self) -> (SetupRequest, SettingsOverrides, OutputFlags, PathBuf) {
        let request = SetupRequest {
            ssl_crt: self.ssl_crt,
            ssl_key: self.ssl_key,
            gen_ssl: self.gen_ssl,
            admin_email: self.admin_email,
            admin_password: self.admin_password,
            reg_email: self.reg_email,
            reg_code: self.reg_code,
            accept: self.accept,
            wizard: self.wizard,
        };
        let overrides = SettingsOverrides {
            flavor: self.flavor,
            provider: self.provider,
            log_file: self.log_file,
        };
        let flags = OutputFlags {
            no_color: self.no_color,
            quiet: self.quiet,
        };
        (request, overrides, flags, self.settings)
    }

    /// Execute the setup.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings cannot be loaded or setup fails.
    pub async fn run(self) -> Result<()> {
        let (request, overrides, flags, settings_path) = self.into_parts();
        let mut settings = SetupSettings::load_or_default(&settings_path)?;
        overrides.apply(&mut settings);
        crate::logging::init(&settings.paths.log_file)?;
        tracing::debug!(settings = %settings_path.display(), "settings loaded");

        let app = AppContext::new(&flags, settings);
        commands::setup::run(&app, &request).await
    }
}
