use std::fmt;

use serde::{Deserialize, Serialize};

/// Procurement flavor of the admin node image.
///
/// `Byos` ("bring your own subscription") images must be registered with the
/// update service; `Payg` images are billed through the cloud provider and
/// receive updates without registration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum Flavor {
    #[default]
    Byos,
    Payg,
}

impl Flavor {
    /// Whether setup has to offer registration for this flavor.
    #[must_use]
    pub fn requires_registration(self) -> bool {
        matches!(self, Self::Byos)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Byos => "byos",
            Self::Payg => "payg",
        }
    }
}

impl fmt::Display for Flavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cloud provider the admin node runs on.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum CloudProvider {
    #[default]
    Ec2,
    Azure,
    Gce,
}

impl CloudProvider {
    /// Name used by salt-cloud for the provider driver.
    #[must_use]
    pub fn salt_driver(self) -> &'static str {
        match self {
            Self::Ec2 => "ec2",
            Self::Azure => "azurearm",
            Self::Gce => "gce",
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ec2 => "ec2",
            Self::Azure => "azure",
            Self::Gce => "gce",
        }
    }
}

impl fmt::Display for CloudProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
