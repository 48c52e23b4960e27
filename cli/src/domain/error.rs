//! Typed setup errors.
//!
//! No imports from `crate::infra`, `crate::commands`, `crate::application`,
//! `tokio` or `std::fs`. Errors implement `thiserror::Error` and convert to
//! `anyhow::Error` via the `?` operator.

use thiserror::Error;

/// Fatal setup failures.
///
/// Interactive input errors never show up here: the wizard re-prompts until
/// the value is valid. Registration failures are not errors either, they are
/// reported as warnings and setup continues unregistered.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("Invalid argument {flag}: {reason}")]
    InvalidArgument { flag: &'static str, reason: String },

    #[error(
        "{subsystem} failed to become ready in time (gave up after {attempts} checks, {interval_secs}s apart)"
    )]
    Timeout {
        subsystem: &'static str,
        attempts: u32,
        interval_secs: u64,
    },

    #[error("'{command}' failed ({status}): {stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("{0}")]
    Precondition(String),

    #[error("Setup aborted. No changes were made.")]
    Aborted,
}

impl SetupError {
    /// Build a [`SetupError::CommandFailed`] from a finished process.
    #[must_use]
    pub fn command_failed(command: &str, status: std::process::ExitStatus, stderr: &[u8]) -> Self {
        let status = status
            .code()
            .map_or_else(|| "terminated by signal".to_string(), |c| format!("exit code {c}"));
        Self::CommandFailed {
            command: command.to_string(),
            status,
            stderr: String::from_utf8_lossy(stderr).trim().to_string(),
        }
    }
}
