//! `salt-run` implementation of the `ConfigMaster` port.

use anyhow::{Context, Result};

use crate::application::ports::{CommandRunner, ConfigMaster};
use crate::domain::SetupError;

/// Queries the local salt master through `salt-run --out=json`.
pub struct SaltCli<'a, R> {
    runner: &'a R,
}

impl<'a, R: CommandRunner> SaltCli<'a, R> {
    #[must_use]
    pub fn new(runner: &'a R) -> Self {
        Self { runner }
    }
}

/// Parse `salt-run --out=json` output. Blank output means no answer.
///
/// # Errors
///
/// Returns an error if the output is not JSON.
pub fn parse_salt_json(stdout: &[u8]) -> Result<Option<serde_json::Value>> {
    let text = String::from_utf8_lossy(stdout);
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }
    serde_json::from_str(text)
        .map(Some)
        .context("parsing salt-run output")
}

impl<R: CommandRunner> ConfigMaster for SaltCli<'_, R> {
    async fn query(&self, function: &str) -> Result<Option<serde_json::Value>> {
        let output = self.runner.run("salt-run", &["--out=json", function]).await?;
        if !output.status.success() {
            return Err(SetupError::command_failed(
                &format!("salt-run {function}"),
                output.status,
                &output.stderr,
            )
            .into());
        }
        parse_salt_json(&output.stdout)
    }
}
