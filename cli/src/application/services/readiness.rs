//! Readiness checks for the dashboard and the salt master.
//!
//! Readiness is binary and observed from outside: a running container, a
//! successful database probe printing `ready`, a non-empty answer from the
//! master. Probe errors count as "not ready yet".
//!
//! Imports only from `crate::domain` and `crate::application::ports`.

use anyhow::Result;
use caasp_common::DashboardSettings;

use crate::application::ports::{ConfigMaster, ContainerRuntime, ProgressReporter};
use crate::application::services::poll::{PollPolicy, non_empty, wait_for};

/// Marker the database readiness command prints once the database answers.
pub const DATABASE_READY_MARKER: &str = "ready";

/// Container status the runtime reports for live containers.
pub const RUNNING: &str = "running";

/// A database probe counts only when it exits successfully and prints the
/// marker on a line of its own.
#[must_use]
pub fn database_answered(status: &std::process::ExitStatus, stdout: &[u8]) -> bool {
    status.success()
        && String::from_utf8_lossy(stdout)
            .lines()
            .any(|line| line.trim() == DATABASE_READY_MARKER)
}

/// Wait for the dashboard container, then for its database.
///
/// Returns the dashboard container ID for later `exec` calls.
///
/// # Errors
///
/// Returns `SetupError::Timeout` naming the container or the database when
/// either wait exhausts `policy`.
pub async fn wait_for_dashboard(
    runtime: &impl ContainerRuntime,
    dashboard: &DashboardSettings,
    policy: &PollPolicy,
    reporter: &impl ProgressReporter,
) -> Result<String> {
    reporter.step("waiting for the dashboard container...");
    let filter = dashboard.container_filter.as_str();
    let container = wait_for(policy, "dashboard container", move || async move {
        runtime.find_container(filter, RUNNING).await.ok().flatten()
    })
    .await
    .ok_or_else(|| policy.timeout("dashboard container"))?;
    reporter.success(&format!("dashboard container {container} is running"));

    reporter.step("waiting for the dashboard database...");
    let id = container.as_str();
    let argv: Vec<&str> = dashboard
        .database_ready_command
        .iter()
        .map(String::as_str)
        .collect();
    let argv = argv.as_slice();
    wait_for(policy, "dashboard database", move || async move {
        let output = runtime.exec(id, argv).await.ok()?;
        database_answered(&output.status, &output.stdout).then_some(())
    })
    .await
    .ok_or_else(|| policy.timeout("dashboard database"))?;
    reporter.success("dashboard database is ready");

    Ok(container)
}

/// Wait for the salt master to answer `query`.
///
/// # Errors
///
/// Returns `SetupError::Timeout` when the master stays silent for the whole
/// `policy` budget.
pub async fn wait_for_salt_master(
    master: &impl ConfigMaster,
    query: &str,
    policy: &PollPolicy,
    reporter: &impl ProgressReporter,
) -> Result<()> {
    reporter.step("waiting for the salt master...");
    wait_for(policy, "salt master", move || async move {
        master.query(query).await.ok().flatten().and_then(|value| {
            let rendered = value.to_string();
            non_empty(&rendered).filter(|s| s != "null" && s != "{}" && s != "[]")
        })
    })
    .await
    .ok_or_else(|| policy.timeout("salt master"))?;
    reporter.success("salt master is responding");
    Ok(())
}
