//! Microsoft Azure adapter.
//!
//! Instance metadata is one JSON document; permissions come from the VM's
//! managed identity, which salt-cloud also uses for its API calls.

use std::collections::BTreeMap;
use std::net::Ipv4Addr;
use std::path::Path;

use anyhow::{Context, Result};
use caasp_common::CloudProvider;
use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use tracing::info;

use super::metadata::MetadataClient;
use super::{ensure_ssh_key, non_blank, public_key_path};
use crate::application::ports::{CommandRunner, Platform, SaltCloudContext};

const IMDS_BASE: &str = "http://169.254.169.254/metadata";
const INSTANCE_PATH: &str = "instance?api-version=2021-02-01";
const TOKEN_PATH: &str =
    "identity/oauth2/token?api-version=2018-02-01&resource=https://management.azure.com/";

/// VM size for new cluster nodes.
pub const NODE_SIZE: &str = "Standard_D4s_v3";

/// Salt-cloud provider alias.
pub const PROVIDER_ALIAS: &str = "caasp-azure";

pub struct AzurePlatform<'a, R> {
    runner: &'a R,
    imds: MetadataClient,
}

/// The parts of the Azure instance metadata document setup reads.
#[derive(Debug, Clone, Deserialize)]
pub struct AzureInstance {
    pub compute: Compute,
    pub network: Network,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Compute {
    pub vm_id: String,
    pub location: String,
    pub resource_group_name: String,
    pub subscription_id: String,
    #[serde(default)]
    pub storage_profile: Option<StorageProfile>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageProfile {
    pub image_reference: ImageReference,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImageReference {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub publisher: String,
    #[serde(default)]
    pub offer: String,
    #[serde(default)]
    pub sku: String,
    #[serde(default)]
    pub version: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Network {
    pub interface: Vec<Interface>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Interface {
    pub ipv4: InterfaceIpv4,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterfaceIpv4 {
    pub ip_address: Vec<IpAddress>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IpAddress {
    pub private_ip_address: String,
    #[serde(default)]
    pub public_ip_address: String,
}

impl AzureInstance {
    /// First private address of the first interface.
    ///
    /// # Errors
    ///
    /// Returns an error if no address is listed or it is not IPv4.
    pub fn private_ipv4(&self) -> Result<Ipv4Addr> {
        let ip = self
            .network
            .interface
            .first()
            .and_then(|i| i.ipv4.ip_address.first())
            .context("instance metadata lists no private IPv4 address")?;
        ip.private_ip_address
            .parse()
            .with_context(|| format!("invalid private IPv4 '{}'", ip.private_ip_address))
    }

    /// Public address of the first interface, when one is attached.
    #[must_use]
    pub fn public_ipv4(&self) -> Option<String> {
        self.network
            .interface
            .first()
            .and_then(|i| i.ipv4.ip_address.first())
            .and_then(|ip| non_blank(&ip.public_ip_address))
    }

    /// Image reference salt-cloud understands: a resource ID for custom
    /// images, `publisher|offer|sku|version` for marketplace ones.
    #[must_use]
    pub fn image(&self) -> String {
        let Some(profile) = &self.compute.storage_profile else {
            return String::new();
        };
        let r = &profile.image_reference;
        if r.id.is_empty() {
            format!("{}|{}|{}|{}", r.publisher, r.offer, r.sku, r.version)
        } else {
            r.id.clone()
        }
    }
}

impl<'a, R: CommandRunner> AzurePlatform<'a, R> {
    /// # Errors
    ///
    /// Returns an error if the metadata client cannot be built.
    pub fn new(runner: &'a R) -> Result<Self> {
        Ok(Self {
            runner,
            imds: MetadataClient::new(IMDS_BASE, vec![("Metadata", "true".to_string())])?,
        })
    }

    async fn instance(&self) -> Result<AzureInstance> {
        self.imds
            .json(INSTANCE_PATH, &[])
            .await
            .context("reading Azure instance metadata")
    }
}

/// Salt-cloud provider document for `instance`.
#[must_use]
pub fn provider_config(instance: &AzureInstance, ctx: &SaltCloudContext<'_>) -> Value {
    let mut minion = Mapping::new();
    minion.insert("master".into(), ctx.master_ipv4.to_string().into());

    let compute = &instance.compute;
    let mut provider = Mapping::new();
    provider.insert("driver".into(), CloudProvider::Azure.salt_driver().into());
    provider.insert("subscription_id".into(), compute.subscription_id.clone().into());
    provider.insert("location".into(), compute.location.clone().into());
    provider.insert("resource_group".into(), compute.resource_group_name.clone().into());
    provider.insert(
        "network_resource_group".into(),
        compute.resource_group_name.clone().into(),
    );
    provider.insert("cleanup_disks".into(), true.into());
    provider.insert("cleanup_interfaces".into(), true.into());
    provider.insert("minion".into(), Value::Mapping(minion));

    let mut doc = Mapping::new();
    doc.insert(PROVIDER_ALIAS.into(), Value::Mapping(provider));
    Value::Mapping(doc)
}

/// Salt-cloud profile document for `instance`.
#[must_use]
pub fn profile_config(instance: &AzureInstance, ctx: &SaltCloudContext<'_>) -> Value {
    let mut profile = Mapping::new();
    profile.insert("provider".into(), PROVIDER_ALIAS.into());
    profile.insert("image".into(), instance.image().into());
    profile.insert("size".into(), NODE_SIZE.into());
    profile.insert("ssh_username".into(), "caasp".into());
    profile.insert(
        "ssh_keyfile".into(),
        ctx.private_key.to_string_lossy().into_owned().into(),
    );
    profile.insert(
        "ssh_publickeyfile".into(),
        public_key_path(ctx.private_key)
            .to_string_lossy()
            .into_owned()
            .into(),
    );
    profile.insert("script".into(), ctx.script.into());

    let mut doc = Mapping::new();
    doc.insert("caasp-node".into(), Value::Mapping(profile));
    Value::Mapping(doc)
}

impl<R: CommandRunner> Platform for AzurePlatform<'_, R> {
    fn provider(&self) -> CloudProvider {
        CloudProvider::Azure
    }

    async fn get_instance_id(&self) -> Result<String> {
        Ok(self.instance().await?.compute.vm_id)
    }

    async fn get_local_ipv4(&self) -> Result<Ipv4Addr> {
        self.instance().await?.private_ipv4()
    }

    async fn get_public_hostname(&self) -> Result<Option<String>> {
        Ok(self.instance().await?.public_ipv4())
    }

    async fn have_permissions(&self) -> Result<bool> {
        Ok(self.imds.reachable(TOKEN_PATH, &[]).await)
    }

    async fn create_public_key(&self, private_key: &Path) -> Result<String> {
        ensure_ssh_key(self.runner, private_key).await
    }

    async fn setup_network_security(&self) -> Result<()> {
        // New nodes join the admin node's virtual network; the default
        // AllowVnetInBound rule already admits salt traffic.
        info!(target: "audit", "network security unchanged (virtual network rules apply)");
        Ok(())
    }

    async fn get_database_pillars(&self) -> Result<BTreeMap<String, String>> {
        let compute = self.instance().await?.compute;
        Ok(BTreeMap::from([
            ("cloud:profiles:cluster_node:size".to_string(), NODE_SIZE.to_string()),
            ("cloud:providers:azure:location".to_string(), compute.location),
            (
                "cloud:providers:azure:resource_group".to_string(),
                compute.resource_group_name,
            ),
            (
                "cloud:providers:azure:subscription_id".to_string(),
                compute.subscription_id,
            ),
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
