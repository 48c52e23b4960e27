//! Google Compute Engine adapter.

use std::collections::BTreeMap;
use std::net::Ipv4Addr;
use std::path::Path;

use anyhow::{Context, Result};
use caasp_common::CloudProvider;
use serde_yaml::{Mapping, Value};
use tracing::info;

use super::metadata::{MetadataClient, last_segment};
use super::{SALT_PORTS, ensure_ssh_key, non_blank, run_idempotent};
use crate::application::ports::{CommandRunner, Platform, SaltCloudContext};

const METADATA_BASE: &str = "http://metadata.google.internal/computeMetadata/v1";

/// Scope that grants the compute API access salt-cloud needs.
const REQUIRED_SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/cloud-platform",
    "https://www.googleapis.com/auth/compute",
];

/// Machine type for new cluster nodes.
pub const NODE_SIZE: &str = "n1-standard-4";

/// Salt-cloud provider alias.
pub const PROVIDER_ALIAS: &str = "caasp-gce";

/// Network tag carried by cluster nodes.
pub const NODE_TAG: &str = "caasp-node";

/// Firewall rule admitting salt traffic from cluster nodes.
pub const FIREWALL_RULE: &str = "caasp-salt-master";

pub struct GcePlatform<'a, R> {
    runner: &'a R,
    metadata: MetadataClient,
}

/// Facts about the admin instance new nodes are modelled on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GceInstance {
    pub project: String,
    pub zone: String,
    pub network: String,
    pub image: String,
    pub service_account: String,
}

/// Whether the newline-separated `scopes` include one that allows compute
/// API calls.
#[must_use]
pub fn scopes_allow_compute(scopes: &str) -> bool {
    scopes
        .lines()
        .map(str::trim)
        .any(|s| REQUIRED_SCOPES.contains(&s))
}

impl<'a, R: CommandRunner> GcePlatform<'a, R> {
    /// # Errors
    ///
    /// Returns an error if the metadata client cannot be built.
    pub fn new(runner: &'a R) -> Result<Self> {
        Ok(Self {
            runner,
            metadata: MetadataClient::new(
                METADATA_BASE,
                vec![("Metadata-Flavor", "Google".to_string())],
            )?,
        })
    }

    async fn get(&self, path: &str) -> Result<String> {
        self.metadata.text(path, &[]).await
    }

    async fn instance(&self) -> Result<GceInstance> {
        Ok(GceInstance {
            project: self.get("project/project-id").await?,
            zone: last_segment(&self.get("instance/zone").await?).to_string(),
            network: last_segment(&self.get("instance/network-interfaces/0/network").await?)
                .to_string(),
            image: last_segment(&self.get("instance/image").await?).to_string(),
            service_account: self.get("instance/service-accounts/default/email").await?,
        })
    }
}

/// Salt-cloud provider document for `instance`.
#[must_use]
pub fn provider_config(instance: &GceInstance, ctx: &SaltCloudContext<'_>) -> Value {
    let mut minion = Mapping::new();
    minion.insert("master".into(), ctx.master_ipv4.to_string().into());

    let mut provider = Mapping::new();
    provider.insert("driver".into(), CloudProvider::Gce.salt_driver().into());
    provider.insert("project".into(), instance.project.clone().into());
    provider.insert(
        "service_account_email_address".into(),
        instance.service_account.clone().into(),
    );
    provider.insert("service_account_private_key".into(), "".into());
    provider.insert(
        "ssh_keyfile".into(),
        ctx.private_key.to_string_lossy().into_owned().into(),
    );
    provider.insert("ssh_interface".into(), "private_ips".into());
    provider.insert("minion".into(), Value::Mapping(minion));

    let mut doc = Mapping::new();
    doc.insert(PROVIDER_ALIAS.into(), Value::Mapping(provider));
    Value::Mapping(doc)
}

/// Salt-cloud profile document for `instance`.
#[must_use]
pub fn profile_config(instance: &GceInstance, ctx: &SaltCloudContext<'_>) -> Value {
    let mut profile = Mapping::new();
    profile.insert("provider".into(), PROVIDER_ALIAS.into());
    profile.insert("image".into(), instance.image.clone().into());
    profile.insert("size".into(), NODE_SIZE.into());
    profile.insert("location".into(), instance.zone.clone().into());
    profile.insert("network".into(), instance.network.clone().into());
    profile.insert("tags".into(), format!("[\"{NODE_TAG}\"]").into());
    profile.insert("ssh_username".into(), "caasp".into());
    profile.insert("script".into(), ctx.script.into());

    let mut doc = Mapping::new();
    doc.insert("caasp-node".into(), Value::Mapping(profile));
    Value::Mapping(doc)
}

impl<R: CommandRunner> Platform for GcePlatform<'_, R> {
    fn provider(&self) -> CloudProvider {
        CloudProvider::Gce
    }

    async fn get_instance_id(&self) -> Result<String> {
        self.get("instance/id").await
    }

    async fn get_local_ipv4(&self) -> Result<Ipv4Addr> {
        let ip = self.get("instance/network-interfaces/0/ip").await?;
        ip.parse()
            .with_context(|| format!("instance metadata returned invalid IPv4 '{ip}'"))
    }

    async fn get_public_hostname(&self) -> Result<Option<String>> {
        // Instances without an access config have no external address.
        Ok(self
            .get("instance/network-interfaces/0/access-configs/0/external-ip")
            .await
            .ok()
            .and_then(|ip| non_blank(&ip)))
    }

    async fn have_permissions(&self) -> Result<bool> {
        match self.get("instance/service-accounts/default/scopes").await {
            Ok(scopes) => Ok(scopes_allow_compute(&scopes)),
            Err(_) => Ok(false),
        }
    }

    async fn create_public_key(&self, private_key: &Path) -> Result<String> {
        ensure_ssh_key(self.runner, private_key).await
    }

    async fn setup_network_security(&self) -> Result<()> {
        let instance = self.instance().await?;
        let allow = format!("tcp:{}-{}", SALT_PORTS.0, SALT_PORTS.1);
        run_idempotent(
            self.runner,
            "gcloud",
            &[
                "compute",
                "firewall-rules",
                "create",
                FIREWALL_RULE,
                "--project",
                &instance.project,
                "--network",
                &instance.network,
                "--allow",
                &allow,
                "--source-tags",
                NODE_TAG,
                "--quiet",
            ],
            &["already exists"],
        )
        .await?;
        info!(target: "audit", rule = FIREWALL_RULE, network = %instance.network, "salt firewall rule in place");
        Ok(())
    }

    async fn get_database_pillars(&self) -> Result<BTreeMap<String, String>> {
        let instance = self.instance().await?;
        Ok(BTreeMap::from([
            ("cloud:profiles:cluster_node:size".to_string(), NODE_SIZE.to_string()),
            ("cloud:providers:gce:project".to_string(), instance.project),
            ("cloud:providers:gce:zone".to_string(), instance.zone),
            ("cloud:providers:gce:network".to_string(), instance.network),
        ]))
    }

    async fn get_salt_cloud_profile_config(
        &self,
        ctx: &SaltCloudContext<'_>,
    ) -> Result<serde_yaml::Value> {
        Ok(profile_config(&self.instance().await?, ctx))
    }

    async fn get_salt_cloud_provider_config(
        &self,
        ctx: &SaltCloudContext<'_>,
    ) -> Result<serde_yaml::Value> {
        Ok(provider_config(&self.instance().await?, ctx))
    }
}
