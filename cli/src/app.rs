//! Application context passed to the setup command.
//!
//! `AppContext` gathers output styling, settings, wait budgets and the
//! process runner every adapter shares. Adding a cross-cutting concern
//! requires only one field change here.

use std::path::PathBuf;

use caasp_common::{CloudProvider, Flavor, SetupSettings};

use crate::application::services::setup::Timings;
use crate::infra::command_runner::{DEFAULT_CMD_TIMEOUT, TokioCommandRunner};
use crate::output::OutputContext;

/// Output rendering flags.
pub struct OutputFlags {
    /// Disable ANSI color output.
    pub no_color: bool,
    /// Suppress non-error output.
    pub quiet: bool,
}

/// Overrides applied on top of the settings file.
#[derive(Default)]
pub struct SettingsOverrides {
    pub flavor: Option<Flavor>,
    pub provider: Option<CloudProvider>,
    pub log_file: Option<PathBuf>,
}

impl SettingsOverrides {
    /// Apply every override that was given.
    pub fn apply(self, settings: &mut SetupSettings) {
        if let Some(flavor) = self.flavor {
            settings.flavor = flavor;
        }
        if let Some(provider) = self.provider {
            settings.provider = provider;
        }
        if let Some(log_file) = self.log_file {
            settings.paths.log_file = log_file;
        }
    }
}

/// Unified application context passed to the setup command.
pub struct AppContext {
    /// Terminal output context (colors, quiet mode).
    pub output: OutputContext,
    /// Effective settings (file plus command-line overrides).
    pub settings: SetupSettings,
    /// Wait budgets.
    pub timings: Timings,
    /// Process runner shared by every adapter.
    pub runner: TokioCommandRunner,
}

impl AppContext {
    /// Construct an `AppContext` from output flags and resolved settings.
    #[must_use]
    pub fn new(flags: &OutputFlags, settings: SetupSettings) -> Self {
        Self {
            output: OutputContext::new(flags.no_color, flags.quiet),
            settings,
            timings: Timings::default(),
            runner: TokioCommandRunner::new(DEFAULT_CMD_TIMEOUT),
        }
    }
}
