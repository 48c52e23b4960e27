use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{CloudProvider, Flavor};

/// Default location of the setup settings file.
pub const DEFAULT_SETTINGS_PATH: &str = "/etc/caasp/admin-setup.yaml";

/// Errors raised while loading [`SetupSettings`].
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("cannot read settings file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid settings file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Admin node setup settings, read from `/etc/caasp/admin-setup.yaml`.
///
/// Every key is optional; the image ships without the file and relies on the
/// defaults below.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SetupSettings {
    /// Procurement flavor of the image.
    pub flavor: Flavor,
    /// Cloud provider the node runs on.
    pub provider: CloudProvider,
    /// Minimum `MemTotal` (KiB) the host must report.
    pub min_memory_kib: u64,
    /// Name the dashboard is reached under from outside the cloud network.
    /// Looked up from instance metadata when unset.
    pub external_fqdn: Option<String>,
    /// Files read or written during setup.
    pub paths: PathSettings,
    /// Dashboard container integration.
    pub dashboard: DashboardSettings,
    /// Salt runner function used to probe the salt master.
    pub master_query: String,
    /// Units enabled and started during provisioning, in order.
    pub services: Vec<String>,
    /// Activation script; generates the self-signed pair when none is installed.
    pub activation_command: Vec<String>,
    /// Registration tool invoked as `<tool> -e <email> -r <code>`.
    pub registration_command: String,
    /// Login banner written once setup has finished.
    pub banner: String,
}

/// Filesystem locations used by setup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathSettings {
    pub ssl_crt: PathBuf,
    pub ssl_key: PathBuf,
    pub deploy_script: PathBuf,
    pub etcd_config: PathBuf,
    pub pillar_file: PathBuf,
    pub salt_cloud_providers: PathBuf,
    pub salt_cloud_profiles: PathBuf,
    /// Private key used by salt-cloud; the public half lives next to it.
    pub salt_cloud_key: PathBuf,
    pub motd: PathBuf,
    pub log_file: PathBuf,
}

/// How setup talks to the dashboard container.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardSettings {
    /// Container name filter passed to the container runtime.
    pub container_filter: String,
    /// Command run inside the container; prints `ready` once the database answers.
    pub database_ready_command: Vec<String>,
    /// Prefix for rake tasks run inside the container.
    pub rake_command: Vec<String>,
    pub create_user_task: String,
    pub pillar_task: String,
}

impl Default for SetupSettings {
    fn default() -> Self {
        Self {
            flavor: Flavor::default(),
            provider: CloudProvider::default(),
            min_memory_kib: 3_670_016,
            external_fqdn: None,
            paths: PathSettings::default(),
            dashboard: DashboardSettings::default(),
            master_query: "manage.versions".to_string(),
            services: ["docker", "container-feeder", "etcd", "kubelet"]
                .map(String::from)
                .to_vec(),
            activation_command: vec!["/usr/share/caasp-container-manifests/activate.sh".to_string()],
            registration_command: "SUSEConnect".to_string(),
            banner: "Welcome to the CaaSP admin node.\n\
                     Manage the cluster from the dashboard at https://<this node>/\n"
                .to_string(),
        }
    }
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            ssl_crt: PathBuf::from("/etc/pki/velum.crt"),
            ssl_key: PathBuf::from("/etc/pki/private/velum.key"),
            deploy_script: PathBuf::from("/etc/salt/cloud.deploy.d/caasp-node.sh"),
            etcd_config: PathBuf::from("/etc/sysconfig/etcd"),
            pillar_file: PathBuf::from("/srv/pillar/caasp-cluster.sls"),
            salt_cloud_providers: PathBuf::from("/etc/salt/cloud.providers.d/caasp.conf"),
            salt_cloud_profiles: PathBuf::from("/etc/salt/cloud.profiles.d/caasp.conf"),
            salt_cloud_key: PathBuf::from("/etc/salt/pki/cloud/caasp"),
            motd: PathBuf::from("/etc/motd"),
            log_file: PathBuf::from("/var/log/caasp-admin-setup.log"),
        }
    }
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            container_filter: "velum-dashboard".to_string(),
            database_ready_command: [
                "entrypoint.sh",
                "bundle",
                "exec",
                "rails",
                "runner",
                "ActiveRecord::Base.connection; puts 'ready'",
            ]
            .map(String::from)
            .to_vec(),
            rake_command: ["entrypoint.sh", "bundle", "exec", "rake"]
                .map(String::from)
                .to_vec(),
            create_user_task: "velum:create_user".to_string(),
            pillar_task: "velum:create_pillar".to_string(),
        }
    }
}

impl SetupSettings {
    /// Load settings from `path`.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load settings from `path`, falling back to defaults when it does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self, SettingsError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse settings from YAML. An empty document yields the defaults.
    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
    }

    /// Public half of the salt-cloud key pair.
    #[must_use]
    pub fn salt_cloud_public_key(&self) -> PathBuf {
        let mut name = self.paths.salt_cloud_key.clone().into_os_string();
        name.push(".pub");
        PathBuf::from(name)
    }
}
