//! caasp-admin-setup - one-shot CaaSP admin node configuration

use clap::Parser;

use caasp_admin_setup::cli::Cli;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = cli.run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
