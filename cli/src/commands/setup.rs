//! Setup command: wires the production adapters into the setup service and
//! reports the result.

use anyhow::Result;

use crate::app::AppContext;
use crate::application::services::setup::{SetupPorts, run_setup};
use crate::domain::SetupRequest;
use crate::infra::docker::DockerCli;
use crate::infra::fs::LocalSystemFs;
use crate::infra::host::LocalHost;
use crate::infra::platform::platform_for;
use crate::infra::prompter::DialoguerPrompter;
use crate::infra::salt::SaltCli;
use crate::output::{TerminalReporter, summary_lines};

/// Run the admin node setup.
///
/// # Errors
///
/// Returns the first fatal setup error.
pub async fn run(app: &AppContext, request: &SetupRequest) -> Result<()> {
    let runner = &app.runner;
    let platform = platform_for(app.settings.provider, runner)?;
    let containers = DockerCli::new(runner);
    let master = SaltCli::new(runner);
    let host = LocalHost::new(runner);
    let reporter = TerminalReporter::new(&app.output);
    let ports = SetupPorts {
        platform: &platform,
        containers: &containers,
        master: &master,
        runner,
        fs: &LocalSystemFs,
        host: &host,
        prompter: &DialoguerPrompter,
        reporter: &reporter,
    };

    app.output.title("CaaSP admin node setup");
    let report = run_setup(request, &app.settings, &app.timings, &ports).await?;
    app.output.summary(&summary_lines(&report, &app.settings.registration_command));
    Ok(())
}
