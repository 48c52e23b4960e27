//! Port trait definitions for the Application layer.
//!
//! Ports are the interfaces (contracts) that infrastructure must fulfill.
//! This file imports only from `crate::domain` and `caasp_common`, never
//! from `crate::infra`, `crate::commands`, or `crate::output`.

use std::collections::BTreeMap;
use std::net::Ipv4Addr;
use std::path::Path;
use std::process::Output;
use std::time::Duration;

use anyhow::Result;
use caasp_common::CloudProvider;

// ── Command Runner Port ───────────────────────────────────────────────────────

/// Abstracts process execution so infrastructure can be swapped or mocked.
#[allow(async_fn_in_trait)]
pub trait CommandRunner {
    /// Run a program and capture its output.
    ///
    /// Implementations should delegate to `run_with_timeout` using the
    /// instance's configured default timeout.
    async fn run(&self, program: &str, args: &[&str]) -> Result<Output>;
    /// Run a program with a custom timeout override.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned or exceeds `timeout`.
    /// On timeout, the child process must be killed (not left orphaned).
    async fn run_with_timeout(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<Output>;
}

// ── Operator Interaction Port ─────────────────────────────────────────────────

/// Reads one answer from the operator.
///
/// Implementations only read; resolving defaults, interpreting yes/no and
/// audit logging happen in `application::services::input` so every prompter
/// behaves the same.
pub trait Prompter {
    /// Show `prompt` and read a line. `secret` input must not be echoed.
    /// An empty string means the operator just pressed enter.
    fn read_line(&self, prompt: &str, secret: bool) -> Result<String>;
}

// ── Progress Reporting Port ───────────────────────────────────────────────────

/// Abstracts progress reporting so services can emit events without
/// depending on the Presentation layer. Synchronous.
pub trait ProgressReporter {
    /// Emit an in-progress step message.
    fn step(&self, message: &str);
    /// Emit a success message.
    fn success(&self, message: &str);
    /// Emit a warning message.
    fn warn(&self, message: &str);
    /// Emit a labelled value (configuration summary rows).
    fn detail(&self, label: &str, value: &str);
}

// ── Container Runtime Port ────────────────────────────────────────────────────

/// The container runtime hosting the dashboard.
#[allow(async_fn_in_trait)]
pub trait ContainerRuntime {
    /// ID of the first container whose name matches `name_filter` and whose
    /// status is `status`, or `None`.
    async fn find_container(&self, name_filter: &str, status: &str) -> Result<Option<String>>;
    /// Run `argv` inside `container` and capture its output.
    async fn exec(&self, container: &str, argv: &[&str]) -> Result<Output>;
}

// ── Configuration Master Port ─────────────────────────────────────────────────

/// The configuration-management control plane (salt master).
#[allow(async_fn_in_trait)]
pub trait ConfigMaster {
    /// Run a master-side query. `None` when the master returned nothing.
    async fn query(&self, function: &str) -> Result<Option<serde_json::Value>>;
}

// ── Platform Port ─────────────────────────────────────────────────────────────

/// Inputs for the salt-cloud provider and profile documents.
pub struct SaltCloudContext<'a> {
    /// Private key salt-cloud uses to reach new nodes.
    pub private_key: &'a Path,
    /// Address new minions use to reach the salt master.
    pub master_ipv4: Ipv4Addr,
    /// Name of the deploy script salt-cloud runs on new nodes.
    pub script: &'a str,
}

/// Cloud platform the admin node runs on.
#[allow(async_fn_in_trait)]
pub trait Platform {
    /// Which provider this is.
    fn provider(&self) -> CloudProvider;
    /// Instance identifier; doubles as the default admin password.
    async fn get_instance_id(&self) -> Result<String>;
    /// Primary private IPv4 address of this instance.
    async fn get_local_ipv4(&self) -> Result<Ipv4Addr>;
    /// Public DNS name or address, `None` for instances without one.
    async fn get_public_hostname(&self) -> Result<Option<String>>;
    /// Whether the instance may manage cloud resources for new nodes.
    async fn have_permissions(&self) -> Result<bool>;
    /// Create (or reuse) the key pair at `private_key`; returns the public key.
    async fn create_public_key(&self, private_key: &Path) -> Result<String>;
    /// Open the ports cluster nodes need to reach the admin node.
    async fn setup_network_security(&self) -> Result<()>;
    /// Platform pillars (`key` → value) written to the cluster pillar file.
    async fn get_database_pillars(&self) -> Result<BTreeMap<String, String>>;
    /// salt-cloud profile document.
    async fn get_salt_cloud_profile_config(
        &self,
        ctx: &SaltCloudContext<'_>,
    ) -> Result<serde_yaml::Value>;
    /// salt-cloud provider document.
    async fn get_salt_cloud_provider_config(
        &self,
        ctx: &SaltCloudContext<'_>,
    ) -> Result<serde_yaml::Value>;
}

// ── Filesystem Port ───────────────────────────────────────────────────────────

/// Root-owned system files.
pub trait SystemFs {
    fn exists(&self, path: &Path) -> bool;
    /// Current size in bytes, `None` when the file does not exist.
    fn size(&self, path: &Path) -> Option<u64>;
    fn read(&self, path: &Path) -> Result<Vec<u8>>;
    /// Install `src` at `dest`: chown root:root, chmod 0600, then move.
    fn install_private(&self, src: &Path, dest: &Path) -> Result<()>;
    /// Replace `path` atomically (temporary file + rename) with `mode` permissions.
    fn write_atomic(&self, path: &Path, content: &[u8], mode: u32) -> Result<()>;
}

// ── Host Port ─────────────────────────────────────────────────────────────────

/// Facts about the host setup runs on.
#[allow(async_fn_in_trait)]
pub trait HostFacts {
    /// Whether the process runs with an effective uid of 0.
    fn is_root(&self) -> bool;
    /// `MemTotal` in KiB.
    fn mem_total_kib(&self) -> Result<u64>;
    /// Fully qualified host name.
    async fn fqdn(&self) -> Result<String>;
}
