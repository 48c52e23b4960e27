//! Provisioning steps against recording ports.

#![allow(clippy::expect_used)]

use std::path::{Path, PathBuf};

use caasp_admin_setup::application::services::account::{
    create_admin_account, write_pillar_file, write_pillars,
};
use caasp_admin_setup::application::services::provision::{
    activate, configure_etcd, enable_services, initialize_platform, install_certificates,
    register, write_deploy_script,
};
use caasp_admin_setup::domain::pillar::cluster_pillars;
use caasp_admin_setup::domain::{
    CertificateSource, Configuration, Registration, RegistrationOutcome, SetupError,
};
use caasp_common::{CloudProvider, Flavor, SetupSettings};

use crate::mocks::{
    DASHBOARD_ID, FQDN, LOCAL_IP, MemFs, MockContainers, MockPlatform, RecordingReporter,
    RecordingRunner, err_output, fixture, ok_output,
};

fn registration() -> Registration {
    Registration {
        email: "billing@example.com".to_string(),
        code: "REGCODE-123".to_string(),
    }
}

// ── Certificates ──────────────────────────────────────────────────────────────

#[test]
fn provided_certificates_are_installed_privately() {
    let settings = SetupSettings::default();
    let fs = MemFs::default()
        .with_file("/root/velum.crt", &fixture("velum.crt"))
        .with_file("/root/velum.key", &fixture("velum.key"));
    let config = Configuration {
        certificate: CertificateSource::Provided {
            crt: PathBuf::from("/root/velum.crt"),
            key: PathBuf::from("/root/velum.key"),
        },
        admin_email: "ops@example.com".to_string(),
        admin_password: "long enough".to_string(),
        registration: None,
        accept: true,
    };

    install_certificates(&config, &settings, &fs, &RecordingReporter::default())
        .expect("installed");

    assert_eq!(fs.mode("/etc/pki/velum.crt"), Some(0o600));
    assert_eq!(fs.mode("/etc/pki/private/velum.key"), Some(0o600));
    assert!(fs.content("/root/velum.crt").is_none(), "moved, not copied");
}

// ── Registration ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn registration_success() {
    let runner = RecordingRunner::default().respond("SUSEConnect", ok_output(b"Successfully registered system\n"));
    let reporter = RecordingReporter::default();

    let outcome = register(Some(&registration()), "SUSEConnect", &runner, &reporter).await;

    assert_eq!(outcome, RegistrationOutcome::Registered);
    assert_eq!(
        runner.commands(),
        ["SUSEConnect -e billing@example.com -r REGCODE-123"]
    );
}

#[tokio::test]
async fn registration_error_line_is_a_warning() {
    let runner = RecordingRunner::default().respond(
        "SUSEConnect",
        ok_output(b"Registering system to SUSE Customer Center\nERROR: Invalid registration code\n"),
    );
    let reporter = RecordingReporter::default();

    let outcome = register(Some(&registration()), "SUSEConnect", &runner, &reporter).await;

    assert_eq!(
        outcome,
        RegistrationOutcome::Failed {
            reason: "ERROR: Invalid registration code".to_string()
        }
    );
    assert_eq!(reporter.warnings().len(), 1);
}

#[tokio::test]
async fn registration_non_zero_exit_is_a_warning() {
    let runner = RecordingRunner::default().respond("SUSEConnect", err_output(67, b"network down"));

    let outcome = register(
        Some(&registration()),
        "SUSEConnect",
        &runner,
        &RecordingReporter::default(),
    )
    .await;

    assert!(matches!(outcome, RegistrationOutcome::Failed { .. }));
}

#[tokio::test]
async fn registration_tool_missing_is_a_warning() {
    let runner = RecordingRunner::default().unspawnable("SUSEConnect");

    let outcome = register(
        Some(&registration()),
        "SUSEConnect",
        &runner,
        &RecordingReporter::default(),
    )
    .await;

    assert!(matches!(outcome, RegistrationOutcome::Failed { reason } if reason.contains("spawn")));
}

#[tokio::test]
async fn no_registration_runs_nothing() {
    let runner = RecordingRunner::default();

    let outcome = register(None, "SUSEConnect", &runner, &RecordingReporter::default()).await;

    assert_eq!(outcome, RegistrationOutcome::Skipped);
    assert!(runner.calls.borrow().is_empty());
}

// ── Deploy script ─────────────────────────────────────────────────────────────

#[test]
fn deploy_script_embeds_registration_only_when_registered() {
    let settings = SetupSettings::default();
    let path = settings.paths.deploy_script.to_string_lossy().into_owned();
    let reg = registration();

    let fs = MemFs::default();
    write_deploy_script(Some(&reg), &RegistrationOutcome::Registered, &settings, &fs)
        .expect("written");
    assert!(fs.content(&path).expect("script").contains("REGCODE-123"));
    assert_eq!(fs.mode(&path), Some(0o600));

    let fs = MemFs::default();
    let failed = RegistrationOutcome::Failed {
        reason: "x".to_string(),
    };
    write_deploy_script(Some(&reg), &failed, &settings, &fs).expect("written");
    assert!(!fs.content(&path).expect("script").contains("REGCODE-123"));
}

// ── etcd ──────────────────────────────────────────────────────────────────────

#[test]
fn etcd_configuration_points_at_local_address() {
    let fs = MemFs::default().with_file(
        "/etc/sysconfig/etcd",
        b"ETCD_NAME=\"master\"\n#ETCD_LISTEN_CLIENT_URLS=\"http://localhost:2379\"\n",
    );

    configure_etcd(LOCAL_IP, Path::new("/etc/sysconfig/etcd"), &fs).expect("configured");

    let content = fs.content("/etc/sysconfig/etcd").expect("file");
    assert!(content.contains("ETCD_NAME=\"master\""));
    assert!(content.contains(
        "ETCD_LISTEN_CLIENT_URLS=\"http://10.0.0.5:2379,http://127.0.0.1:2379\""
    ));
    assert!(content.contains("ETCD_ADVERTISE_CLIENT_URLS=\"http://10.0.0.5:2379\""));
    assert!(!content.contains("localhost"));
}

// ── Platform ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn platform_initialization_writes_salt_cloud_documents() {
    let settings = SetupSettings::default();
    let platform = MockPlatform::default();
    let fs = MemFs::default();

    initialize_platform(&platform, &settings, LOCAL_IP, &fs, &RecordingReporter::default())
        .await
        .expect("initialized");

    assert_eq!(
        *platform.calls.borrow(),
        [
            "create_public_key",
            "setup_network_security",
            "get_salt_cloud_provider_config",
            "get_salt_cloud_profile_config",
        ]
    );
    let providers = fs
        .content("/etc/salt/cloud.providers.d/caasp.conf")
        .expect("providers");
    assert!(providers.contains("master: 10.0.0.5"));
    assert_eq!(fs.mode("/etc/salt/cloud.providers.d/caasp.conf"), Some(0o600));
    let profiles = fs
        .content("/etc/salt/cloud.profiles.d/caasp.conf")
        .expect("profiles");
    assert!(profiles.contains("script: caasp-node"));
}

// ── Activation and services ───────────────────────────────────────────────────

#[tokio::test]
async fn services_are_enabled_then_started_in_order() {
    let runner = RecordingRunner::default();
    let services = ["docker".to_string(), "kubelet".to_string()];

    enable_services(&services, &runner, &RecordingReporter::default())
        .await
        .expect("started");

    assert_eq!(
        runner.commands(),
        [
            "systemctl enable docker",
            "systemctl start docker",
            "systemctl enable kubelet",
            "systemctl start kubelet",
        ]
    );
}

#[tokio::test]
async fn failing_service_carries_status_and_stderr() {
    let runner = RecordingRunner::default()
        .respond("systemctl", err_output(5, b"Unit docker.service not found.\n"));

    let err = enable_services(&["docker".to_string()], &runner, &RecordingReporter::default())
        .await
        .expect_err("unit missing");

    assert_eq!(
        err.to_string(),
        "'systemctl enable docker' failed (exit code 5): Unit docker.service not found."
    );
    assert_eq!(runner.calls.borrow().len(), 1, "stops at the first failure");
}

#[tokio::test]
async fn activation_failure_is_fatal() {
    let settings = SetupSettings::default();
    let runner = RecordingRunner::default().respond(
        "/usr/share/caasp-container-manifests/activate.sh",
        err_output(1, b"cannot pull images"),
    );

    let err = activate(&settings, &runner, &RecordingReporter::default())
        .await
        .expect_err("activation failed");

    assert!(matches!(
        err.downcast_ref::<SetupError>(),
        Some(SetupError::CommandFailed { .. })
    ));
}

// ── Account and pillars ───────────────────────────────────────────────────────

#[tokio::test]
async fn admin_account_created_through_rake() {
    let settings = SetupSettings::default();
    let containers = MockContainers::immediately();

    create_admin_account(
        &containers,
        DASHBOARD_ID,
        &settings.dashboard,
        "ops@example.com",
        "pass,word",
    )
    .await
    .expect("created");

    let calls = containers.rake_calls.borrow();
    assert_eq!(
        calls[0],
        [
            "entrypoint.sh",
            "bundle",
            "exec",
            "rake",
            "velum:create_user[ops@example.com,pass\\,word]",
        ]
    );
}

#[tokio::test]
async fn failing_account_creation_hides_the_password() {
    let settings = SetupSettings::default();
    let mut containers = MockContainers::immediately();
    containers.rake_failure = Some(err_output(1, b"Validation failed: Email has already been taken"));

    let err = create_admin_account(
        &containers,
        DASHBOARD_ID,
        &settings.dashboard,
        "ops@example.com",
        "hunter2hunter2",
    )
    .await
    .expect_err("rake failed");

    let message = format!("{err:#}");
    assert!(!message.contains("hunter2hunter2"));
    assert!(message.contains("already been taken"));
}

#[tokio::test]
async fn pillars_are_stored_one_task_each() {
    let settings = SetupSettings::default();
    let containers = MockContainers::immediately();
    let pillars = cluster_pillars(FQDN, FQDN, CloudProvider::Ec2, Flavor::Byos, true);

    write_pillars(&containers, DASHBOARD_ID, &settings.dashboard, &pillars)
        .await
        .expect("stored");

    let invocations = containers.rake_invocations();
    assert_eq!(invocations.len(), 5);
    assert!(invocations.contains(&"velum:create_pillar[cloud:registered,true]".to_string()));
    assert!(invocations.contains(&format!("velum:create_pillar[dashboard,{FQDN}]")));
}

#[tokio::test]
async fn pillar_file_merges_platform_pillars() {
    let settings = SetupSettings::default();
    let fs = MemFs::default();

    let written = write_pillar_file(&MockPlatform::default(), &settings, FQDN, FQDN, false, &fs)
        .await
        .expect("written");

    assert_eq!(written.len(), 6);
    let content = fs.content("/srv/pillar/caasp-cluster.sls").expect("pillar file");
    let doc: serde_yaml::Value = serde_yaml::from_str(&content).expect("valid YAML");
    assert_eq!(doc["cloud"]["framework"], "ec2");
    assert_eq!(doc["cloud"]["registered"], "false");
    assert_eq!(doc["cloud"]["providers"]["ec2"]["region"], "eu-central-1");
    assert_eq!(doc["dashboard"], FQDN);
}
