//! Audit log and diagnostics.
//!
//! Two `tracing` layers: a plain-text audit trail appended to the log file,
//! and stderr diagnostics filtered by `RUST_LOG`.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use anyhow::Result;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;
use tracing_subscriber::{EnvFilter, Layer as _, fmt};

/// What reaches the log file.
const FILE_FILTER: &str = "info,caasp_admin_setup=debug";

/// What reaches stderr unless `RUST_LOG` says otherwise. Audit events are
/// already shown to the operator through the progress reporter.
const STDERR_FILTER: &str = "warn,audit=off";

/// Install the global subscriber.
///
/// An unwritable log file is reported on stderr and setup carries on without
/// it; the root precondition check produces the real error.
///
/// # Errors
///
/// Returns an error if a global subscriber was already installed.
pub fn init(log_file: &Path) -> Result<()> {
    let file_layer = match open_log(log_file) {
        Ok(file) => Some(
            fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .with_filter(EnvFilter::new(FILE_FILTER)),
        ),
        Err(e) => {
            eprintln!("warning: cannot open log file {}: {e}", log_file.display());
            None
        }
    };

    let stderr_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(STDERR_FILTER));
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(stderr_filter);

    tracing_subscriber::registry()
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("installing log subscriber: {e}"))
}

fn open_log(path: &Path) -> std::io::Result<std::fs::File> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}
