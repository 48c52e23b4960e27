//! Argument parsing, settings loading and precondition failures, seen from
//! the outside.

#![allow(clippy::expect_used)]

use std::io::Write;

use assert_cmd::Command;
use predicates::prelude::*;

fn setup_cmd() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("caasp-admin-setup"));
    cmd.env("NO_COLOR", "1");
    cmd.env_remove("CAASP_SETUP_CONFIG");
    cmd
}

fn settings_file(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(content.as_bytes()).expect("write settings");
    file
}

// --- Help and version ---

#[test]
fn test_help_lists_setup_flags() {
    setup_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage:"))
        .stdout(predicate::str::contains("--ssl-crt"))
        .stdout(predicate::str::contains("--gen-ssl"))
        .stdout(predicate::str::contains("--reg-code"));
}

#[test]
fn test_version_flag_shows_version() {
    setup_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("caasp-admin-setup 0.1.0"));
}

// --- Argument errors ---

#[test]
fn test_gen_ssl_conflicts_with_certificate() {
    setup_cmd()
        .args(["--gen-ssl", "--ssl-crt", "/root/velum.crt"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("cannot be used with"));
}

#[test]
fn test_unknown_provider_is_rejected() {
    setup_cmd()
        .args(["--provider", "openstack"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("invalid value 'openstack'"));
}

#[test]
fn test_unknown_flavor_is_rejected() {
    setup_cmd()
        .args(["--flavor", "trial"])
        .assert()
        .code(2);
}

// --- Settings ---

#[test]
fn test_invalid_settings_file_fails() {
    let settings = settings_file("min_memory_kib: [not, a, number]\n");
    setup_cmd()
        .arg("--settings")
        .arg(settings.path())
        .args(["--gen-ssl", "-y"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Error: invalid settings file"));
}

#[test]
fn test_settings_path_from_environment() {
    let settings = settings_file("flavor: [broken\n");
    setup_cmd()
        .env("CAASP_SETUP_CONFIG", settings.path())
        .args(["--gen-ssl", "-y"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Error: invalid settings file"));
}

// --- Preconditions ---

#[test]
fn test_non_root_run_stops_at_precondition() {
    if rustix::process::geteuid().is_root() {
        return;
    }
    let dir = tempfile::tempdir().expect("temp dir");
    let log = dir.path().join("setup.log");
    let settings = settings_file("provider: ec2\n");

    setup_cmd()
        .arg("--settings")
        .arg(settings.path())
        .arg("--log-file")
        .arg(&log)
        .args(["--gen-ssl", "-y"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains(
            "Error: caasp-admin-setup must be run as root",
        ));

    let audit = std::fs::read_to_string(&log).expect("log file written");
    assert!(audit.contains("setup started"));
}
