//! Shared mock ports for unit tests.
//!
//! Every mock records what it was asked so tests can assert on the
//! interaction, and answers from a script or a simple counter.

#![allow(dead_code, clippy::expect_used)]

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::net::Ipv4Addr;
use std::os::unix::process::ExitStatusExt;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Output};
use std::time::Duration;

use anyhow::Result;
use caasp_admin_setup::application::ports::{
    CommandRunner, ConfigMaster, ContainerRuntime, HostFacts, Platform, ProgressReporter,
    Prompter, SaltCloudContext, SystemFs,
};
use caasp_common::CloudProvider;

// ── Output helpers ────────────────────────────────────────────────────────────

pub fn exit_status(code: i32) -> ExitStatus {
    ExitStatus::from_raw(code << 8)
}

pub fn ok_output(stdout: &[u8]) -> Output {
    Output {
        status: exit_status(0),
        stdout: stdout.to_vec(),
        stderr: Vec::new(),
    }
}

pub fn err_output(code: i32, stderr: &[u8]) -> Output {
    Output {
        status: exit_status(code),
        stdout: Vec::new(),
        stderr: stderr.to_vec(),
    }
}

pub fn fixture(name: &str) -> Vec<u8> {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    std::fs::read(&path).expect("fixture exists")
}

// ── Prompter ──────────────────────────────────────────────────────────────────

/// Answers prompts from a fixed script; fails when the script runs out.
#[derive(Default)]
pub struct ScriptedPrompter {
    answers: RefCell<VecDeque<String>>,
    pub prompts: RefCell<Vec<(String, bool)>>,
}

impl ScriptedPrompter {
    pub fn new(answers: &[&str]) -> Self {
        Self {
            answers: RefCell::new(answers.iter().map(|a| (*a).to_string()).collect()),
            prompts: RefCell::new(Vec::new()),
        }
    }

    pub fn prompt_count(&self) -> usize {
        self.prompts.borrow().len()
    }

    pub fn remaining(&self) -> usize {
        self.answers.borrow().len()
    }
}

impl Prompter for ScriptedPrompter {
    fn read_line(&self, prompt: &str, secret: bool) -> Result<String> {
        self.prompts.borrow_mut().push((prompt.to_string(), secret));
        self.answers
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| anyhow::anyhow!("no scripted answer for '{prompt}'"))
    }
}

// ── Reporter ──────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingReporter {
    pub events: RefCell<Vec<String>>,
}

impl RecordingReporter {
    pub fn warnings(&self) -> Vec<String> {
        self.events
            .borrow()
            .iter()
            .filter_map(|e| e.strip_prefix("warn: ").map(str::to_string))
            .collect()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.events.borrow().iter().any(|e| e.contains(needle))
    }
}

impl ProgressReporter for RecordingReporter {
    fn step(&self, message: &str) {
        self.events.borrow_mut().push(format!("step: {message}"));
    }
    fn success(&self, message: &str) {
        self.events.borrow_mut().push(format!("success: {message}"));
    }
    fn warn(&self, message: &str) {
        self.events.borrow_mut().push(format!("warn: {message}"));
    }
    fn detail(&self, label: &str, value: &str) {
        self.events.borrow_mut().push(format!("detail: {label} {value}"));
    }
}

// ── Command runner ────────────────────────────────────────────────────────────

/// Records every invocation. Programs answer with a configured output,
/// fail to spawn when listed in `unspawnable`, and succeed silently
/// otherwise.
#[derive(Default)]
pub struct RecordingRunner {
    pub calls: RefCell<Vec<Vec<String>>>,
    responses: RefCell<HashMap<String, Output>>,
    unspawnable: RefCell<Vec<String>>,
}

impl RecordingRunner {
    pub fn respond(self, program: &str, output: Output) -> Self {
        self.responses
            .borrow_mut()
            .insert(program.to_string(), output);
        self
    }

    pub fn unspawnable(self, program: &str) -> Self {
        self.unspawnable.borrow_mut().push(program.to_string());
        self
    }

    pub fn commands(&self) -> Vec<String> {
        self.calls.borrow().iter().map(|c| c.join(" ")).collect()
    }

    pub fn called(&self, program: &str) -> bool {
        self.calls.borrow().iter().any(|c| c[0] == program)
    }
}

impl CommandRunner for RecordingRunner {
    async fn run(&self, program: &str, args: &[&str]) -> Result<Output> {
        self.run_with_timeout(program, args, Duration::from_secs(1)).await
    }

    async fn run_with_timeout(
        &self,
        program: &str,
        args: &[&str],
        _timeout: Duration,
    ) -> Result<Output> {
        let mut call = vec![program.to_string()];
        call.extend(args.iter().map(|a| (*a).to_string()));
        self.calls.borrow_mut().push(call);
        if self.unspawnable.borrow().iter().any(|p| p == program) {
            anyhow::bail!("failed to spawn {program}");
        }
        Ok(self
            .responses
            .borrow()
            .get(program)
            .cloned()
            .unwrap_or_else(|| ok_output(b"")))
    }
}

// ── Container runtime ─────────────────────────────────────────────────────────

/// Dashboard container that starts running on the `running_on`-th lookup and
/// whose database answers on the `ready_on`-th probe. Earlier probes return
/// `pending_probe`.
pub struct MockContainers {
    pub running_on: u32,
    pub ready_on: u32,
    pub pending_probe: Output,
    pub lookups: Cell<u32>,
    pub probes: Cell<u32>,
    pub rake_calls: RefCell<Vec<Vec<String>>>,
    pub rake_failure: Option<Output>,
}

impl MockContainers {
    pub fn ready_after(running_on: u32, ready_on: u32) -> Self {
        Self {
            running_on,
            ready_on,
            pending_probe: ok_output(b""),
            lookups: Cell::new(0),
            probes: Cell::new(0),
            rake_calls: RefCell::new(Vec::new()),
            rake_failure: None,
        }
    }

    pub fn immediately() -> Self {
        Self::ready_after(1, 1)
    }

    pub fn rake_invocations(&self) -> Vec<String> {
        self.rake_calls
            .borrow()
            .iter()
            .filter_map(|argv| argv.last().cloned())
            .collect()
    }
}

pub const DASHBOARD_ID: &str = "5d1c0ffee";

impl ContainerRuntime for MockContainers {
    async fn find_container(&self, _name_filter: &str, status: &str) -> Result<Option<String>> {
        assert_eq!(status, "running");
        self.lookups.set(self.lookups.get() + 1);
        Ok((self.lookups.get() >= self.running_on).then(|| DASHBOARD_ID.to_string()))
    }

    async fn exec(&self, container: &str, argv: &[&str]) -> Result<Output> {
        assert_eq!(container, DASHBOARD_ID);
        if argv.iter().any(|a| a.contains("ActiveRecord")) {
            self.probes.set(self.probes.get() + 1);
            if self.probes.get() >= self.ready_on {
                return Ok(ok_output(b"ready\n"));
            }
            return Ok(self.pending_probe.clone());
        }
        self.rake_calls
            .borrow_mut()
            .push(argv.iter().map(|a| (*a).to_string()).collect());
        Ok(self.rake_failure.clone().unwrap_or_else(|| ok_output(b"")))
    }
}

// ── Config master ─────────────────────────────────────────────────────────────

/// Salt master that answers `{}` until the `answers_on`-th query.
pub struct MockMaster {
    pub answers_on: u32,
    pub queries: Cell<u32>,
}

impl MockMaster {
    pub fn answering_on(answers_on: u32) -> Self {
        Self {
            answers_on,
            queries: Cell::new(0),
        }
    }
}

impl ConfigMaster for MockMaster {
    async fn query(&self, _function: &str) -> Result<Option<serde_json::Value>> {
        self.queries.set(self.queries.get() + 1);
        if self.queries.get() >= self.answers_on {
            Ok(Some(serde_json::json!({"Up-to-date": {"admin": "2019.2.0"}})))
        } else {
            Ok(Some(serde_json::json!({})))
        }
    }
}

// ── Platform ──────────────────────────────────────────────────────────────────

pub const INSTANCE_ID: &str = "i-0123456789abcdef";
pub const LOCAL_IP: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 5);

pub struct MockPlatform {
    pub permissions: bool,
    pub public_hostname: Option<String>,
    pub calls: RefCell<Vec<&'static str>>,
}

impl Default for MockPlatform {
    fn default() -> Self {
        Self {
            permissions: true,
            public_hostname: None,
            calls: RefCell::new(Vec::new()),
        }
    }
}

impl MockPlatform {
    fn record(&self, call: &'static str) {
        self.calls.borrow_mut().push(call);
    }
}

impl Platform for MockPlatform {
    fn provider(&self) -> CloudProvider {
        CloudProvider::Ec2
    }

    async fn get_instance_id(&self) -> Result<String> {
        self.record("get_instance_id");
        Ok(INSTANCE_ID.to_string())
    }

    async fn get_local_ipv4(&self) -> Result<Ipv4Addr> {
        self.record("get_local_ipv4");
        Ok(LOCAL_IP)
    }

    async fn get_public_hostname(&self) -> Result<Option<String>> {
        self.record("get_public_hostname");
        Ok(self.public_hostname.clone())
    }

    async fn have_permissions(&self) -> Result<bool> {
        self.record("have_permissions");
        Ok(self.permissions)
    }

    async fn create_public_key(&self, _private_key: &Path) -> Result<String> {
        self.record("create_public_key");
        Ok("ssh-rsa AAAAB3NzaC1yc2E caasp-admin".to_string())
    }

    async fn setup_network_security(&self) -> Result<()> {
        self.record("setup_network_security");
        Ok(())
    }

    async fn get_database_pillars(&self) -> Result<BTreeMap<String, String>> {
        self.record("get_database_pillars");
        Ok(BTreeMap::from([(
            "cloud:providers:ec2:region".to_string(),
            "eu-central-1".to_string(),
        )]))
    }

    async fn get_salt_cloud_profile_config(
        &self,
        ctx: &SaltCloudContext<'_>,
    ) -> Result<serde_yaml::Value> {
        self.record("get_salt_cloud_profile_config");
        Ok(serde_yaml::from_str(&format!(
            "caasp-node:\n  provider: caasp-ec2\n  script: {}\n",
            ctx.script
        ))?)
    }

    async fn get_salt_cloud_provider_config(
        &self,
        ctx: &SaltCloudContext<'_>,
    ) -> Result<serde_yaml::Value> {
        self.record("get_salt_cloud_provider_config");
        Ok(serde_yaml::from_str(&format!(
            "caasp-ec2:\n  driver: ec2\n  minion:\n    master: {}\n",
            ctx.master_ipv4
        ))?)
    }
}

// ── Filesystem ────────────────────────────────────────────────────────────────

/// In-memory filesystem. Paths registered with [`MemFs::growing`] report a
/// larger size on each of their first `n` size samples.
#[derive(Default)]
pub struct MemFs {
    pub files: RefCell<BTreeMap<PathBuf, Vec<u8>>>,
    pub modes: RefCell<BTreeMap<PathBuf, u32>>,
    growth: RefCell<HashMap<PathBuf, u32>>,
    pub size_samples: Cell<u32>,
}

impl MemFs {
    pub fn with_file(self, path: &str, content: &[u8]) -> Self {
        self.files
            .borrow_mut()
            .insert(PathBuf::from(path), content.to_vec());
        self
    }

    pub fn growing(self, path: &str, samples: u32) -> Self {
        self.growth.borrow_mut().insert(PathBuf::from(path), samples);
        self
    }

    pub fn content(&self, path: &str) -> Option<String> {
        self.files
            .borrow()
            .get(Path::new(path))
            .map(|c| String::from_utf8_lossy(c).into_owned())
    }

    pub fn mode(&self, path: &str) -> Option<u32> {
        self.modes.borrow().get(Path::new(path)).copied()
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        self.files.borrow().keys().cloned().collect()
    }
}

impl SystemFs for MemFs {
    fn exists(&self, path: &Path) -> bool {
        self.files.borrow().contains_key(path)
    }

    fn size(&self, path: &Path) -> Option<u64> {
        self.size_samples.set(self.size_samples.get() + 1);
        let len = self.files.borrow().get(path)?.len() as u64;
        let mut growth = self.growth.borrow_mut();
        match growth.get_mut(path) {
            Some(left) if *left > 0 => {
                *left -= 1;
                Some(len - u64::from(*left) - 1)
            }
            _ => Some(len),
        }
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        self.files
            .borrow()
            .get(path)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("{} not found", path.display()))
    }

    fn install_private(&self, src: &Path, dest: &Path) -> Result<()> {
        let content = self
            .files
            .borrow_mut()
            .remove(src)
            .ok_or_else(|| anyhow::anyhow!("{} not found", src.display()))?;
        self.files.borrow_mut().insert(dest.to_path_buf(), content);
        self.modes.borrow_mut().insert(dest.to_path_buf(), 0o600);
        Ok(())
    }

    fn write_atomic(&self, path: &Path, content: &[u8], mode: u32) -> Result<()> {
        self.files
            .borrow_mut()
            .insert(path.to_path_buf(), content.to_vec());
        self.modes.borrow_mut().insert(path.to_path_buf(), mode);
        Ok(())
    }
}

// ── Host ──────────────────────────────────────────────────────────────────────

pub const FQDN: &str = "admin.caasp.example.com";

pub struct MockHost {
    pub root: bool,
    pub mem_kib: u64,
}

impl Default for MockHost {
    fn default() -> Self {
        Self {
            root: true,
            mem_kib: 8_041_712,
        }
    }
}

impl HostFacts for MockHost {
    fn is_root(&self) -> bool {
        self.root
    }

    fn mem_total_kib(&self) -> Result<u64> {
        Ok(self.mem_kib)
    }

    async fn fqdn(&self) -> Result<String> {
        Ok(FQDN.to_string())
    }
}
