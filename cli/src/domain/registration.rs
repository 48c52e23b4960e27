//! Registration tool output and the node deploy script.

use crate::domain::config::Registration;

/// Outcome of registering the admin node with the update service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationOutcome {
    /// The flavor does not need registration, or the operator declined.
    Skipped,
    Registered,
    /// The tool reported an error; setup continues unregistered.
    Failed { reason: String },
}

impl RegistrationOutcome {
    #[must_use]
    pub fn is_registered(&self) -> bool {
        matches!(self, Self::Registered)
    }
}

/// First output line the registration tool flagged as an error.
///
/// The tool exits 0 on some failures, so its output is scanned for lines
/// starting with `error` (any case) on either stream.
#[must_use]
pub fn find_error_line<'a>(stdout: &'a str, stderr: &'a str) -> Option<&'a str> {
    stdout
        .lines()
        .chain(stderr.lines())
        .map(str::trim)
        .find(|line| line.to_ascii_lowercase().starts_with("error"))
}

/// Quote `value` for a POSIX shell.
#[must_use]
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Bootstrap script salt-cloud runs on every new cluster node.
///
/// When the admin node was registered, the same credentials register the
/// node before the salt minion is installed.
#[must_use]
pub fn render_deploy_script(registration: Option<&Registration>, tool: &str) -> String {
    let reg_opts = registration.map_or_else(String::new, |reg| {
        format!("-e {} -r {}", shell_quote(&reg.email), shell_quote(&reg.code))
    });
    format!(
        r#"#!/bin/sh
# Written by caasp-admin-setup. Changes are overwritten on re-run.
set -e

REG_OPTS={reg_opts}

if [ -n "$REG_OPTS" ]; then
    eval {tool} "$REG_OPTS"
fi

zypper --non-interactive install salt-minion
systemctl enable --now salt-minion
"#,
        reg_opts = shell_quote(&reg_opts),
        tool = shell_quote(tool),
    )
}
