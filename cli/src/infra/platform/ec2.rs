//! Amazon EC2 adapter.
//!
//! Metadata comes from IMDSv2 (session token, then token-authenticated
//! GETs). Cloud resources are managed through the instance role with the
//! `aws` CLI.

use std::collections::BTreeMap;
use std::net::Ipv4Addr;
use std::path::Path;

use anyhow::{Context, Result};
use caasp_common::CloudProvider;
use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use tracing::info;

use super::metadata::MetadataClient;
use super::{SALT_PORTS, ensure_ssh_key, non_blank, run_idempotent};
use crate::application::ports::{CommandRunner, Platform, SaltCloudContext};

const IMDS_BASE: &str = "http://169.254.169.254/latest";
const TOKEN_TTL_HEADER: &str = "X-aws-ec2-metadata-token-ttl-seconds";
const TOKEN_HEADER: &str = "X-aws-ec2-metadata-token";

/// Instance type for new cluster nodes.
pub const NODE_SIZE: &str = "m5.xlarge";

/// Salt-cloud provider alias.
pub const PROVIDER_ALIAS: &str = "caasp-ec2";

pub struct Ec2Platform<'a, R> {
    runner: &'a R,
    imds: MetadataClient,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct IamInfo {
    code: String,
}

/// Facts about the admin instance new nodes are modelled on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ec2Instance {
    pub instance_id: String,
    pub region: String,
    pub image_id: String,
    pub subnet_id: String,
    pub security_group_id: String,
}

impl<'a, R: CommandRunner> Ec2Platform<'a, R> {
    /// # Errors
    ///
    /// Returns an error if the metadata client cannot be built.
    pub fn new(runner: &'a R) -> Result<Self> {
        Ok(Self {
            runner,
            imds: MetadataClient::new(IMDS_BASE, Vec::new())?,
        })
    }

    async fn token(&self) -> Result<String> {
        self.imds
            .put_text("api/token", &[(TOKEN_TTL_HEADER, "300")])
            .await
            .context("requesting IMDSv2 session token")
    }

    async fn meta(&self, path: &str) -> Result<String> {
        let token = self.token().await?;
        self.imds
            .text(&format!("meta-data/{path}"), &[(TOKEN_HEADER, &token)])
            .await
    }

    async fn instance(&self) -> Result<Ec2Instance> {
        let mac = self.meta("mac").await?;
        let interface = format!("network/interfaces/macs/{mac}");
        let groups = self.meta(&format!("{interface}/security-group-ids")).await?;
        Ok(Ec2Instance {
            instance_id: self.meta("instance-id").await?,
            region: self.meta("placement/region").await?,
            image_id: self.meta("ami-id").await?,
            subnet_id: self.meta(&format!("{interface}/subnet-id")).await?,
            security_group_id: groups
                .lines()
                .next()
                .context("instance has no security group")?
                .trim()
                .to_string(),
        })
    }
}

/// Salt-cloud provider document for `instance`.
#[must_use]
pub fn provider_config(instance: &Ec2Instance, ctx: &SaltCloudContext<'_>) -> Value {
    let mut minion = Mapping::new();
    minion.insert("master".into(), ctx.master_ipv4.to_string().into());

    let mut provider = Mapping::new();
    provider.insert("driver".into(), CloudProvider::Ec2.salt_driver().into());
    provider.insert("id".into(), "use-instance-role-credentials".into());
    provider.insert("key".into(), "use-instance-role-credentials".into());
    provider.insert("keyname".into(), key_name(&instance.instance_id).into());
    provider.insert(
        "private_key".into(),
        ctx.private_key.to_string_lossy().into_owned().into(),
    );
    provider.insert("location".into(), instance.region.clone().into());
    provider.insert("ssh_interface".into(), "private_ips".into());
    provider.insert("minion".into(), Value::Mapping(minion));

    let mut doc = Mapping::new();
    doc.insert(PROVIDER_ALIAS.into(), Value::Mapping(provider));
    Value::Mapping(doc)
}

/// Salt-cloud profile document for `instance`.
#[must_use]
pub fn profile_config(instance: &Ec2Instance, ctx: &SaltCloudContext<'_>) -> Value {
    let mut network = Mapping::new();
    network.insert("DeviceIndex".into(), 0.into());
    network.insert("SubnetId".into(), instance.subnet_id.clone().into());
    network.insert(
        "SecurityGroupId".into(),
        Value::Sequence(vec![instance.security_group_id.clone().into()]),
    );

    let mut profile = Mapping::new();
    profile.insert("provider".into(), PROVIDER_ALIAS.into());
    profile.insert("image".into(), instance.image_id.clone().into());
    profile.insert("size".into(), NODE_SIZE.into());
    profile.insert("ssh_username".into(), "ec2-user".into());
    profile.insert("script".into(), ctx.script.into());
    profile.insert(
        "network_interfaces".into(),
        Value::Sequence(vec![Value::Mapping(network)]),
    );

    let mut doc = Mapping::new();
    doc.insert("caasp-node".into(), Value::Mapping(profile));
    Value::Mapping(doc)
}

/// EC2 key pair name for the admin node `instance_id`.
#[must_use]
pub fn key_name(instance_id: &str) -> String {
    format!("caasp-{instance_id}")
}

impl<R: CommandRunner> Platform for Ec2Platform<'_, R> {
    fn provider(&self) -> CloudProvider {
        CloudProvider::Ec2
    }

    async fn get_instance_id(&self) -> Result<String> {
        self.meta("instance-id").await
    }

    async fn get_local_ipv4(&self) -> Result<Ipv4Addr> {
        let ip = self.meta("local-ipv4").await?;
        ip.parse()
            .with_context(|| format!("instance metadata returned invalid IPv4 '{ip}'"))
    }

    async fn get_public_hostname(&self) -> Result<Option<String>> {
        // Both keys are missing (404) for instances in private subnets.
        for key in ["public-hostname", "public-ipv4"] {
            if let Some(value) = self.meta(key).await.ok().and_then(|v| non_blank(&v)) {
                return Ok(Some(value));
            }
        }
        Ok(None)
    }

    async fn have_permissions(&self) -> Result<bool> {
        let token = self.token().await?;
        let info: Result<IamInfo> = self
            .imds
            .json("meta-data/iam/info", &[(TOKEN_HEADER, &token)])
            .await;
        Ok(info.is_ok_and(|i| i.code == "Success"))
    }

    async fn create_public_key(&self, private_key: &Path) -> Result<String> {
        let public = ensure_ssh_key(self.runner, private_key).await?;
        let instance = self.meta("instance-id").await?;
        let region = self.meta("placement/region").await?;
        let material = format!("fileb://{}", super::public_key_path(private_key).display());
        run_idempotent(
            self.runner,
            "aws",
            &[
                "ec2",
                "import-key-pair",
                "--region",
                &region,
                "--key-name",
                &key_name(&instance),
                "--public-key-material",
                &material,
            ],
            &["InvalidKeyPair.Duplicate"],
        )
        .await?;
        Ok(public)
    }

    async fn setup_network_security(&self) -> Result<()> {
        let instance = self.instance().await?;
        let ports = format!("{}-{}", SALT_PORTS.0, SALT_PORTS.1);
        let group = instance.security_group_id.as_str();
        run_idempotent(
            self.runner,
            "aws",
            &[
                "ec2",
                "authorize-security-group-ingress",
                "--region",
                &instance.region,
                "--group-id",
                group,
                "--protocol",
                "tcp",
                "--port",
                &ports,
                "--source-group",
                group,
            ],
            &["InvalidPermission.Duplicate"],
        )
        .await?;
        info!(target: "audit", %group, %ports, "salt ports opened within security group");
        Ok(())
    }

    async fn get_database_pillars(&self) -> Result<BTreeMap<String, String>> {
        let instance = self.instance().await?;
        Ok(BTreeMap::from([
            ("cloud:profiles:cluster_node:size".to_string(), NODE_SIZE.to_string()),
            ("cloud:providers:ec2:region".to_string(), instance.region),
            ("cloud:providers:ec2:subnet_id".to_string(), instance.subnet_id),
            (
                "cloud:providers:ec2:security_group_id".to_string(),
                instance.security_group_id,
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
