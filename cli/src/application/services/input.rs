//! Operator questions and validated input.
//!
//! Every question and answer goes to the audit log, secrets redacted. The
//! `*_until_valid` helpers never give up: a human is on the other end.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.

use std::path::Path;

use anyhow::Result;
use tracing::info;

use crate::application::ports::{Prompter, SystemFs};
use crate::application::services::poll::{PollPolicy, wait_for};
use crate::domain::ValidationResult;
use crate::domain::prompt::{
    confirmation_text, interpret_confirmation, loggable_answer, question_text, resolve_answer,
};
use crate::domain::validate::{is_pem_certificate, is_pem_private_key};

/// Ask `question`; an empty answer selects `default`.
///
/// # Errors
///
/// Returns an error if the prompter cannot read from the terminal.
pub fn ask(prompter: &impl Prompter, question: &str, default: &str, secret: bool) -> Result<String> {
    let raw = prompter.read_line(&question_text(question, default, secret), secret)?;
    let answer = resolve_answer(&raw, default, secret);
    info!(
        target: "audit",
        question,
        answer = loggable_answer(&answer, secret),
        "operator answered"
    );
    Ok(answer)
}

/// Ask a yes/no `question`.
///
/// # Errors
///
/// Returns an error if the prompter cannot read from the terminal.
pub fn confirm(prompter: &impl Prompter, question: &str, default: bool) -> Result<bool> {
    let raw = prompter.read_line(&confirmation_text(question, default), false)?;
    let answer = interpret_confirmation(&raw, default);
    info!(target: "audit", question, answer, "operator confirmed");
    Ok(answer)
}

/// Ask until `validate` accepts the answer. Failures are shown to the
/// operator via `on_invalid` and logged; there is no retry limit.
///
/// # Errors
///
/// Returns an error only if the prompter fails.
pub fn ask_until_valid(
    prompter: &impl Prompter,
    question: &str,
    default: &str,
    secret: bool,
    mut validate: impl FnMut(&str) -> ValidationResult,
    mut on_invalid: impl FnMut(&str),
) -> Result<String> {
    loop {
        let answer = ask(prompter, question, default, secret)?;
        let result = validate(&answer);
        result.log();
        if result.valid {
            return Ok(answer);
        }
        on_invalid(result.message());
    }
}

/// Async flavour of [`ask_until_valid`] for checks that wait on the filesystem.
///
/// # Errors
///
/// Returns an error only if the prompter fails.
pub async fn ask_path_until_valid<Fut>(
    prompter: &impl Prompter,
    question: &str,
    mut validate: impl FnMut(String) -> Fut,
    mut on_invalid: impl FnMut(&str),
) -> Result<String>
where
    Fut: std::future::Future<Output = ValidationResult>,
{
    loop {
        let answer = ask(prompter, question, "", false)?;
        let result = validate(answer.clone()).await;
        result.log();
        if result.valid {
            return Ok(answer);
        }
        on_invalid(result.message());
    }
}

/// Sampling used to decide that an uploaded file stopped growing.
#[must_use]
pub fn default_stability_policy() -> PollPolicy {
    PollPolicy::new(12, std::time::Duration::from_secs(5))
}

/// Wait until two consecutive size samples of `path` are equal.
///
/// Returns `false` when the file disappears or keeps changing for the whole
/// `policy` window.
pub async fn wait_for_stable_size(fs: &impl SystemFs, path: &Path, policy: &PollPolicy) -> bool {
    let mut previous: Option<u64> = None;
    wait_for(policy, "stable file size", || {
        let current = fs.size(path);
        let stable = current.is_some() && current == previous;
        previous = current;
        async move { stable.then_some(()) }
    })
    .await
    .is_some()
}

/// Which kind of PEM material a file must hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PemKind {
    Certificate,
    PrivateKey,
}

impl PemKind {
    fn label(self) -> &'static str {
        match self {
            Self::Certificate => "SSL certificate",
            Self::PrivateKey => "SSL key",
        }
    }

    fn accepts(self, data: &[u8]) -> bool {
        match self {
            Self::Certificate => is_pem_certificate(data),
            Self::PrivateKey => is_pem_private_key(data),
        }
    }
}

/// Check a certificate or key file: it must exist, stop changing size
/// within the `policy` window, and parse as `kind`.
pub async fn check_pem_file(
    fs: &impl SystemFs,
    path: &Path,
    kind: PemKind,
    policy: &PollPolicy,
) -> ValidationResult {
    let label = kind.label();
    let shown = path.display();
    let success = format!("{label} {shown} is valid");
    if !fs.exists(path) {
        return ValidationResult::new(false, success, format!("{label} {shown} does not exist"));
    }
    if !wait_for_stable_size(fs, path, policy).await {
        return ValidationResult::new(
            false,
            success,
            format!("{label} {shown} is still changing, is the upload finished?"),
        );
    }
    let parsed = fs.read(path).is_ok_and(|data| kind.accepts(&data));
    ValidationResult::new(parsed, success, format!("{label} {shown} is not a valid PEM file"))
}
