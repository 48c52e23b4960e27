//! Host facts from `/proc`, the effective uid and `hostname`.

use anyhow::{Context, Result};

use crate::application::ports::{CommandRunner, HostFacts};
use crate::domain::SetupError;
use crate::domain::host::parse_mem_total_kib;

const MEMINFO: &str = "/proc/meminfo";

/// The machine this process runs on.
pub struct LocalHost<'a, R> {
    runner: &'a R,
}

impl<'a, R: CommandRunner> LocalHost<'a, R> {
    #[must_use]
    pub fn new(runner: &'a R) -> Self {
        Self { runner }
    }
}

impl<R: CommandRunner> HostFacts for LocalHost<'_, R> {
    fn is_root(&self) -> bool {
        rustix::process::geteuid().is_root()
    }

    fn mem_total_kib(&self) -> Result<u64> {
        let meminfo =
            std::fs::read_to_string(MEMINFO).with_context(|| format!("reading {MEMINFO}"))?;
        parse_mem_total_kib(&meminfo).with_context(|| format!("no MemTotal in {MEMINFO}"))
    }

    async fn fqdn(&self) -> Result<String> {
        let output = self.runner.run("hostname", &["-f"]).await?;
        if !output.status.success() {
            return Err(SetupError::command_failed("hostname -f", output.status, &output.stderr).into());
        }
        let name = String::from_utf8_lossy(&output.stdout).trim().to_string();
        anyhow::ensure!(!name.is_empty(), "hostname -f returned an empty name");
        Ok(name)
    }
}
