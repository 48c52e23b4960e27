//! Cloud platform adapters: implementations of the `Platform` port for each provider.
//!
//! Async-fn traits are not object safe, so [`CloudPlatform`] dispatches over
//! the concrete adapters instead of a `Box<dyn Platform>`.

pub mod azure;
pub mod ec2;
pub mod gce;
pub mod metadata;

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::process::Output;

use anyhow::{Context, Result};
use caasp_common::CloudProvider;
use tracing::info;

pub use azure::AzurePlatform;
pub use ec2::Ec2Platform;
pub use gce::GcePlatform;

use crate::application::ports::{CommandRunner, Platform, SaltCloudContext};
use crate::domain::SetupError;

/// Ports between salt minions and the master.
pub const SALT_PORTS: (u16, u16) = (4505, 4506);

/// The platform setup runs on.
pub enum CloudPlatform<'a, R> {
    Ec2(Ec2Platform<'a, R>),
    Azure(AzurePlatform<'a, R>),
    Gce(GcePlatform<'a, R>),
}

/// Build the adapter for `provider`.
///
/// # Errors
///
/// Returns an error if the metadata client cannot be built.
pub fn platform_for<R: CommandRunner>(
    provider: CloudProvider,
    runner: &R,
) -> Result<CloudPlatform<'_, R>> {
    Ok(match provider {
        CloudProvider::Ec2 => CloudPlatform::Ec2(Ec2Platform::new(runner)?),
        CloudProvider::Azure => CloudPlatform::Azure(AzurePlatform::new(runner)?),
        CloudProvider::Gce => CloudPlatform::Gce(GcePlatform::new(runner)?),
    })
}

macro_rules! dispatch {
    ($self:ident, $p:ident => $call:expr) => {
        match $self {
            CloudPlatform::Ec2($p) => $call,
            CloudPlatform::Azure($p) => $call,
            CloudPlatform::Gce($p) => $call,
        }
    };
}

impl<R: CommandRunner> Platform for CloudPlatform<'_, R> {
    fn provider(&self) -> CloudProvider {
        dispatch!(self, p => p.provider())
    }

    async fn get_instance_id(&self) -> Result<String> {
        dispatch!(self, p => p.get_instance_id().await)
    }

    async fn get_local_ipv4(&self) -> Result<Ipv4Addr> {
        dispatch!(self, p => p.get_local_ipv4().await)
    }

    async fn get_public_hostname(&self) -> Result<Option<String>> {
        dispatch!(self, p => p.get_public_hostname().await)
    }

    async fn have_permissions(&self) -> Result<bool> {
        dispatch!(self, p => p.have_permissions().await)
    }

    async fn create_public_key(&self, private_key: &Path) -> Result<String> {
        dispatch!(self, p => p.create_public_key(private_key).await)
    }

    async fn setup_network_security(&self) -> Result<()> {
        dispatch!(self, p => p.setup_network_security().await)
    }

    async fn get_database_pillars(&self) -> Result<BTreeMap<String, String>> {
        dispatch!(self, p => p.get_database_pillars().await)
    }

    async fn get_salt_cloud_profile_config(
        &self,
        ctx: &SaltCloudContext<'_>,
    ) -> Result<serde_yaml::Value> {
        dispatch!(self, p => p.get_salt_cloud_profile_config(ctx).await)
    }

    async fn get_salt_cloud_provider_config(
        &self,
        ctx: &SaltCloudContext<'_>,
    ) -> Result<serde_yaml::Value> {
        dispatch!(self, p => p.get_salt_cloud_provider_config(ctx).await)
    }
}

/// Trimmed metadata value, `None` when the instance leaves it empty.
#[must_use]
pub fn non_blank(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// `<private_key>.pub`, the path `ssh-keygen` writes the public half to.
#[must_use]
pub fn public_key_path(private_key: &Path) -> PathBuf {
    let mut path = OsString::from(private_key.as_os_str());
    path.push(".pub");
    PathBuf::from(path)
}

/// Generate an RSA key pair at `private_key` unless one exists; returns the
/// public key line.
///
/// # Errors
///
/// Returns an error if `ssh-keygen` fails or the public key cannot be read.
pub async fn ensure_ssh_key(runner: &impl CommandRunner, private_key: &Path) -> Result<String> {
    if !private_key.exists() {
        if let Some(dir) = private_key.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .with_context(|| format!("creating {}", dir.display()))?;
        }
        let path = private_key.to_string_lossy();
        let output = runner
            .run(
                "ssh-keygen",
                &["-q", "-t", "rsa", "-b", "4096", "-N", "", "-C", "caasp-admin", "-f", &path],
            )
            .await?;
        checked("ssh-keygen", output)?;
        info!(target: "audit", key = %path, "salt-cloud key pair generated");
    }
    let public = public_key_path(private_key);
    let key = tokio::fs::read_to_string(&public)
        .await
        .with_context(|| format!("reading {}", public.display()))?;
    Ok(key.trim().to_string())
}

/// Map a non-zero exit to `SetupError::CommandFailed`.
///
/// # Errors
///
/// Returns `SetupError::CommandFailed` when `output` records a failure.
pub fn checked(command: &str, output: Output) -> Result<Output> {
    if output.status.success() {
        Ok(output)
    } else {
        Err(SetupError::command_failed(command, output.status, &output.stderr).into())
    }
}

/// Run a provider CLI call that may already have been applied by an earlier
/// run. Failures whose stderr mentions one of `already` are accepted.
///
/// # Errors
///
/// Returns `SetupError::CommandFailed` for any other failure.
pub async fn run_idempotent(
    runner: &impl CommandRunner,
    program: &str,
    args: &[&str],
    already: &[&str],
) -> Result<()> {
    let output = runner.run(program, args).await?;
    if output.status.success() {
        return Ok(());
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    if already.iter().any(|marker| stderr.contains(marker)) {
        info!(%program, "already configured");
        return Ok(());
    }
    checked(&format!("{program} {}", args.join(" ")), output).map(|_| ())
}
