//! Readiness waits against scripted container runtime and salt master.

#![allow(clippy::expect_used)]

use std::process::Output;
use std::time::Duration;

use caasp_admin_setup::application::services::poll::PollPolicy;
use caasp_admin_setup::application::services::readiness::{
    database_answered, wait_for_dashboard, wait_for_salt_master,
};
use caasp_admin_setup::domain::SetupError;
use caasp_common::DashboardSettings;

use crate::mocks::{
    DASHBOARD_ID, MockContainers, MockMaster, RecordingReporter, err_output, ok_output,
};

fn policy(attempts: u32) -> PollPolicy {
    PollPolicy::new(attempts, Duration::from_secs(5))
}

#[tokio::test(start_paused = true)]
async fn dashboard_ready_on_fifth_lookup() {
    let containers = MockContainers::ready_after(5, 1);
    let reporter = RecordingReporter::default();
    let started = tokio::time::Instant::now();

    let id = wait_for_dashboard(
        &containers,
        &DashboardSettings::default(),
        &policy(10),
        &reporter,
    )
    .await
    .expect("dashboard becomes ready");

    assert_eq!(id, DASHBOARD_ID);
    assert_eq!(containers.lookups.get(), 5);
    assert_eq!(containers.probes.get(), 1);
    // five sleeps for the container, one for the database
    assert_eq!(started.elapsed(), Duration::from_secs(30));
}

#[tokio::test(start_paused = true)]
async fn dashboard_container_timeout_is_fatal() {
    let containers = MockContainers::ready_after(u32::MAX, 1);
    let reporter = RecordingReporter::default();

    let err = wait_for_dashboard(
        &containers,
        &DashboardSettings::default(),
        &policy(4),
        &reporter,
    )
    .await
    .expect_err("container never runs");

    assert_eq!(containers.lookups.get(), 4, "probe called exactly max_attempts times");
    assert_eq!(containers.probes.get(), 0, "database not probed without a container");
    match err.downcast_ref::<SetupError>() {
        Some(SetupError::Timeout { subsystem, attempts, .. }) => {
            assert_eq!(*subsystem, "dashboard container");
            assert_eq!(*attempts, 4);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn dashboard_database_timeout_names_the_database() {
    let containers = MockContainers::ready_after(1, u32::MAX);
    let reporter = RecordingReporter::default();

    let err = wait_for_dashboard(
        &containers,
        &DashboardSettings::default(),
        &policy(3),
        &reporter,
    )
    .await
    .expect_err("database never answers");

    assert!(matches!(
        err.downcast_ref::<SetupError>(),
        Some(SetupError::Timeout { subsystem: "dashboard database", .. })
    ));
    assert_eq!(containers.probes.get(), 3);
}

#[tokio::test(start_paused = true)]
async fn failing_database_check_mentioning_ready_is_not_ready() {
    let mut containers = MockContainers::ready_after(1, u32::MAX);
    containers.pending_probe = Output {
        stdout: b"ActiveRecord::ConnectionNotEstablished: database is not ready\n".to_vec(),
        ..err_output(1, b"")
    };
    let reporter = RecordingReporter::default();

    let err = wait_for_dashboard(
        &containers,
        &DashboardSettings::default(),
        &policy(3),
        &reporter,
    )
    .await
    .expect_err("a failing check never counts as ready");

    assert!(matches!(
        err.downcast_ref::<SetupError>(),
        Some(SetupError::Timeout { subsystem: "dashboard database", .. })
    ));
    assert_eq!(containers.probes.get(), 3);
}

#[test]
fn database_check_needs_success_and_exact_marker() {
    assert!(database_answered(&ok_output(b"").status, b"ready\n"));
    assert!(database_answered(&ok_output(b"").status, b"migrating\n  ready  \n"));
    assert!(!database_answered(&ok_output(b"").status, b"not ready\n"));
    assert!(!database_answered(&err_output(1, b"").status, b"ready\n"));
}

#[tokio::test(start_paused = true)]
async fn salt_master_empty_answers_are_not_ready() {
    let master = MockMaster::answering_on(3);
    let reporter = RecordingReporter::default();

    wait_for_salt_master(&master, "manage.versions", &policy(5), &reporter)
        .await
        .expect("master answers on third query");

    assert_eq!(master.queries.get(), 3);
    assert!(reporter.contains("salt master is responding"));
}

#[tokio::test(start_paused = true)]
async fn salt_master_timeout() {
    let master = MockMaster::answering_on(u32::MAX);
    let reporter = RecordingReporter::default();
    let started = tokio::time::Instant::now();

    let err = wait_for_salt_master(&master, "manage.versions", &policy(6), &reporter)
        .await
        .expect_err("master never answers");

    assert_eq!(master.queries.get(), 6);
    assert_eq!(started.elapsed(), Duration::from_secs(30));
    assert_eq!(
        err.to_string(),
        "salt master failed to become ready in time (gave up after 6 checks, 5s apart)"
    );
}
