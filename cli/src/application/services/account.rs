//! Dashboard admin account and cluster pillars.
//!
//! Both go through rake tasks run inside the dashboard container.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use caasp_common::{DashboardSettings, SetupSettings};
use tracing::info;

use crate::application::ports::{ContainerRuntime, Platform, SystemFs};
use crate::domain::SetupError;
use crate::domain::pillar::{cluster_pillars, render_pillar_file};
use crate::domain::prompt::REDACTED;

/// Escape a rake task argument. Rake splits arguments on unescaped commas.
#[must_use]
pub fn rake_arg(value: &str) -> String {
    value.replace('\\', "\\\\").replace(',', "\\,")
}

/// `task[arg1,arg2,...]` with every argument escaped.
#[must_use]
pub fn rake_invocation(task: &str, args: &[&str]) -> String {
    let args: Vec<String> = args.iter().map(|a| rake_arg(a)).collect();
    format!("{task}[{}]", args.join(","))
}

async fn run_rake(
    runtime: &impl ContainerRuntime,
    container: &str,
    dashboard: &DashboardSettings,
    invocation: &str,
    shown: &str,
) -> Result<()> {
    let mut argv: Vec<&str> = dashboard.rake_command.iter().map(String::as_str).collect();
    argv.push(invocation);
    let output = runtime
        .exec(container, &argv)
        .await
        .with_context(|| format!("running rake {shown}"))?;
    if !output.status.success() {
        return Err(SetupError::command_failed(
            &format!("rake {shown}"),
            output.status,
            &output.stderr,
        )
        .into());
    }
    Ok(())
}

/// Create the dashboard administrator.
///
/// # Errors
///
/// Returns `SetupError::CommandFailed` if the rake task fails. The password
/// never appears in the error.
pub async fn create_admin_account(
    runtime: &impl ContainerRuntime,
    container: &str,
    dashboard: &DashboardSettings,
    email: &str,
    password: &str,
) -> Result<()> {
    let invocation = rake_invocation(&dashboard.create_user_task, &[email, password]);
    let shown = rake_invocation(&dashboard.create_user_task, &[email, REDACTED]);
    run_rake(runtime, container, dashboard, &invocation, &shown).await?;
    info!(target: "audit", %email, "dashboard administrator created");
    Ok(())
}

/// Store each pillar in the dashboard database.
///
/// # Errors
///
/// Returns `SetupError::CommandFailed` for the first pillar the dashboard rejects.
pub async fn write_pillars(
    runtime: &impl ContainerRuntime,
    container: &str,
    dashboard: &DashboardSettings,
    pillars: &BTreeMap<String, String>,
) -> Result<()> {
    for (key, value) in pillars {
        let invocation = rake_invocation(&dashboard.pillar_task, &[key, value]);
        run_rake(runtime, container, dashboard, &invocation, &invocation).await?;
        info!(target: "audit", pillar = %key, %value, "pillar stored");
    }
    Ok(())
}

/// Write the cluster pillar file: core cluster pillars plus the platform's
/// own. Platform values win on a key clash.
///
/// Returns the pillars that were written.
///
/// # Errors
///
/// Returns an error if the platform pillars cannot be gathered, a key is
/// invalid, or the file cannot be written.
pub async fn write_pillar_file(
    platform: &impl Platform,
    settings: &SetupSettings,
    fqdn: &str,
    external_fqdn: &str,
    registered: bool,
    fs: &impl SystemFs,
) -> Result<BTreeMap<String, String>> {
    let mut pillars = cluster_pillars(
        fqdn,
        external_fqdn,
        platform.provider(),
        settings.flavor,
        registered,
    );
    pillars.extend(
        platform
            .get_database_pillars()
            .await
            .context("gathering platform pillars")?,
    );
    let content = render_pillar_file(&pillars)?;
    fs.write_atomic(&settings.paths.pillar_file, content.as_bytes(), 0o644)
        .context("writing pillar file")?;
    info!(target: "audit", path = %settings.paths.pillar_file.display(), count = pillars.len(), "pillar file written");
    Ok(pillars)
}
