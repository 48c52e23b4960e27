//! Interpretation of operator answers. Pure functions, no terminal access.

/// Placeholder logged (and shown in summaries) instead of a secret.
pub const REDACTED: &str = "********";

/// Text shown for a question: the default in brackets, masked for secrets.
#[must_use]
pub fn question_text(question: &str, default: &str, secret: bool) -> String {
    match (default.is_empty(), secret) {
        (true, _) => question.to_string(),
        (false, true) => format!("{question} [{REDACTED}]"),
        (false, false) => format!("{question} [{default}]"),
    }
}

/// Resolve a raw answer: an empty line selects `default`.
///
/// Plain answers are trimmed; secrets are returned verbatim so leading or
/// trailing spaces stay part of the password.
#[must_use]
pub fn resolve_answer(input: &str, default: &str, secret: bool) -> String {
    if input.trim().is_empty() {
        default.to_string()
    } else if secret {
        input.to_string()
    } else {
        input.trim().to_string()
    }
}

/// The answer as it may appear in the audit log.
#[must_use]
pub fn loggable_answer(answer: &str, secret: bool) -> &str {
    if secret { REDACTED } else { answer }
}

/// Yes only for `y`/`yes` (any case), or an empty line when the default is yes.
#[must_use]
pub fn interpret_confirmation(input: &str, default: bool) -> bool {
    match input.trim().to_ascii_lowercase().as_str() {
        "" => default,
        "y" | "yes" => true,
        _ => false,
    }
}

/// `[Y/n]` or `[y/N]`, matching the default.
#[must_use]
pub fn confirmation_text(question: &str, default: bool) -> String {
    let hint = if default { "[Y/n]" } else { "[y/N]" };
    format!("{question} {hint}")
}
