pub mod config;
pub mod pillars;
pub mod types;

pub use config::{DashboardSettings, PathSettings, SettingsError, SetupSettings};
pub use pillars::{keys, validate_pillar_key};
pub use types::*;
