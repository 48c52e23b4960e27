//! `docker` CLI implementation of the `ContainerRuntime` port.

use std::process::Output;

use anyhow::Result;

use crate::application::ports::{CommandRunner, ContainerRuntime};
use crate::domain::SetupError;

/// Talks to the local container runtime through the `docker` binary.
pub struct DockerCli<'a, R> {
    runner: &'a R,
}

impl<'a, R: CommandRunner> DockerCli<'a, R> {
    #[must_use]
    pub fn new(runner: &'a R) -> Self {
        Self { runner }
    }
}

/// First non-empty line of `docker ps --format {{.ID}}` output.
#[must_use]
pub fn first_container_id(stdout: &[u8]) -> Option<String> {
    String::from_utf8_lossy(stdout)
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .map(str::to_string)
}

impl<R: CommandRunner> ContainerRuntime for DockerCli<'_, R> {
    async fn find_container(&self, name_filter: &str, status: &str) -> Result<Option<String>> {
        let name = format!("name={name_filter}");
        let status = format!("status={status}");
        let output = self
            .runner
            .run(
                "docker",
                &["ps", "--filter", &name, "--filter", &status, "--format", "{{.ID}}"],
            )
            .await?;
        if !output.status.success() {
            return Err(SetupError::command_failed("docker ps", output.status, &output.stderr).into());
        }
        Ok(first_container_id(&output.stdout))
    }

    async fn exec(&self, container: &str, argv: &[&str]) -> Result<Output> {
        let mut args = vec!["exec", container];
        args.extend_from_slice(argv);
        self.runner.run("docker", &args).await
    }
}
