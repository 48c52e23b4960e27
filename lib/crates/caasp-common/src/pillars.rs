/// Pillar names written during setup and read by the orchestration states.
///
/// Nested pillars use `:` as the path separator, the same notation salt uses
/// for `pillar.get`.
pub mod keys {
    /// Internal FQDN of the admin node (dashboard host).
    pub const DASHBOARD: &str = "dashboard";

    /// Externally reachable FQDN of the dashboard.
    pub const DASHBOARD_EXTERNAL_FQDN: &str = "dashboard_external_fqdn";

    /// Cloud framework the cluster runs on (`ec2`, `azure`, `gce`).
    pub const CLOUD_FRAMEWORK: &str = "cloud:framework";

    /// Procurement flavor of the image (`byos`, `payg`).
    pub const CLOUD_FLAVOR: &str = "cloud:flavor";

    /// Whether the admin node was registered with the update service.
    pub const CLOUD_REGISTERED: &str = "cloud:registered";
}

/// Validate a pillar key: one or more `:`-separated segments, each starting
/// with a lowercase letter followed by `[a-z0-9_]`.
///
/// Keys are interpolated into rake task arguments, so anything outside this
/// alphabet is refused.
pub fn validate_pillar_key(key: &str) -> Result<(), &'static str> {
    if key.is_empty() {
        return Err("pillar key must not be empty");
    }
    for segment in key.split(':') {
        let mut chars = segment.chars();
        match chars.next() {
            Some(c) if c.is_ascii_lowercase() => {}
            Some(_) => return Err("pillar key segments must start with a lowercase letter"),
            None => return Err("pillar key must not contain empty segments"),
        }
        if !chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_') {
            return Err("pillar key segments may only contain [a-z0-9_]");
        }
    }
    Ok(())
}
