//! Cluster pillar values and the YAML pillar file.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use caasp_common::{CloudProvider, Flavor, keys, validate_pillar_key};
use serde_yaml::{Mapping, Value};

/// Pillars the orchestration layer reads from the dashboard. `fqdn` is the
/// name nodes use inside the cloud network, `external_fqdn` the one browsers
/// and `kubectl` use from outside.
#[must_use]
pub fn cluster_pillars(
    fqdn: &str,
    external_fqdn: &str,
    provider: CloudProvider,
    flavor: Flavor,
    registered: bool,
) -> BTreeMap<String, String> {
    [
        (keys::DASHBOARD, fqdn.to_string()),
        (keys::DASHBOARD_EXTERNAL_FQDN, external_fqdn.to_string()),
        (keys::CLOUD_FRAMEWORK, provider.to_string()),
        (keys::CLOUD_FLAVOR, flavor.to_string()),
        (keys::CLOUD_REGISTERED, registered.to_string()),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

/// Render `pillars` as a nested YAML document, splitting keys on `:`.
///
/// # Errors
///
/// Returns an error if a key is invalid or two keys collide (one is a prefix
/// of the other, e.g. `cloud` and `cloud:flavor`).
pub fn render_pillar_file(pillars: &BTreeMap<String, String>) -> Result<String> {
    let mut root = Mapping::new();
    for (key, value) in pillars {
        validate_pillar_key(key).map_err(|e| anyhow::anyhow!("pillar '{key}': {e}"))?;
        insert_nested(&mut root, key, Value::String(value.clone()))?;
    }
    let body = serde_yaml::to_string(&Value::Mapping(root)).context("serializing pillars")?;
    Ok(format!(
        "# Written by caasp-admin-setup. Changes are overwritten on re-run.\n{body}"
    ))
}

fn insert_nested(root: &mut Mapping, key: &str, value: Value) -> Result<()> {
    let mut segments: Vec<&str> = key.split(':').collect();
    let Some(leaf) = segments.pop() else {
        anyhow::bail!("empty pillar key");
    };
    let mut node = root;
    for segment in segments {
        let entry = node
            .entry(Value::String(segment.to_string()))
            .or_insert_with(|| Value::Mapping(Mapping::new()));
        node = entry
            .as_mapping_mut()
            .with_context(|| format!("pillar '{key}' collides with a scalar at '{segment}'"))?;
    }
    let leaf = Value::String(leaf.to_string());
    anyhow::ensure!(!node.contains_key(&leaf), "pillar '{key}' is set twice");
    node.insert(leaf, value);
    Ok(())
}
