//! Pure input validators. No I/O.
//!
//! Every check returns a [`ValidationResult`] carrying both the success and
//! the failure narration, so the wizard and the argument path report the
//! same wording.

use mailparse::MailAddr;
use tracing::{info, warn};

use crate::domain::error::SetupError;

/// Shortest admin password the dashboard accepts.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Longest admin password the dashboard accepts.
pub const MAX_PASSWORD_LEN: usize = 128;

/// Outcome of a single validation check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    pub valid: bool,
    pub success: String,
    pub failure: String,
}

impl ValidationResult {
    #[must_use]
    pub fn new(valid: bool, success: impl Into<String>, failure: impl Into<String>) -> Self {
        Self {
            valid,
            success: success.into(),
            failure: failure.into(),
        }
    }

    /// The message matching the outcome.
    #[must_use]
    pub fn message(&self) -> &str {
        if self.valid { &self.success } else { &self.failure }
    }

    /// Record the outcome in the audit log.
    pub fn log(&self) {
        if self.valid {
            info!(target: "audit", outcome = "valid", "{}", self.success);
        } else {
            warn!(target: "audit", outcome = "invalid", "{}", self.failure);
        }
    }

    /// Turn a failed check on a command-line flag into a fatal error.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError::InvalidArgument`] when the check failed.
    pub fn require(self, flag: &'static str) -> Result<(), SetupError> {
        self.log();
        if self.valid {
            Ok(())
        } else {
            Err(SetupError::InvalidArgument {
                flag,
                reason: self.failure,
            })
        }
    }
}

/// Check the admin password length against the dashboard's limits.
#[must_use]
pub fn validate_password(password: &str) -> ValidationResult {
    let len = password.chars().count();
    ValidationResult::new(
        (MIN_PASSWORD_LEN..=MAX_PASSWORD_LEN).contains(&len),
        "Password length is valid",
        format!(
            "Password must be between {MIN_PASSWORD_LEN} and {MAX_PASSWORD_LEN} characters long"
        ),
    )
}

/// Check that `email` is a single, well-formed mailbox.
#[must_use]
pub fn validate_email(email: &str) -> ValidationResult {
    ValidationResult::new(
        normalize_email(email).is_some(),
        format!("E-mail address {email} is valid"),
        format!("'{email}' is not a valid e-mail address"),
    )
}

/// Parse `raw` as an address list and return the bare address when it holds
/// exactly one mailbox with exactly one `@` and non-empty local and domain
/// parts. Display names and angle brackets are stripped.
#[must_use]
pub fn normalize_email(raw: &str) -> Option<String> {
    let list = mailparse::addrparse(raw).ok()?;
    let [MailAddr::Single(mailbox)] = list.as_slice() else {
        return None;
    };
    let addr = mailbox.addr.trim();
    let (local, domain) = addr.split_once('@')?;
    let well_formed = !local.is_empty()
        && !domain.is_empty()
        && !domain.contains('@')
        && !addr.chars().any(char::is_whitespace);
    well_formed.then(|| addr.to_string())
}

/// Whether `data` holds a PEM `CERTIFICATE` block with a parseable X.509
/// certificate. The first certificate of a chain is the one checked.
#[must_use]
pub fn is_pem_certificate(data: &[u8]) -> bool {
    let Ok(blocks) = pem::parse_many(data) else {
        return false;
    };
    blocks
        .iter()
        .find(|block| block.tag() == "CERTIFICATE")
        .is_some_and(|block| x509_parser::parse_x509_certificate(block.contents()).is_ok())
}

/// Whether `data` holds an unencrypted PEM private key (PKCS#8, PKCS#1 or
/// SEC1) whose body is well-formed DER.
#[must_use]
pub fn is_pem_private_key(data: &[u8]) -> bool {
    let Ok(blocks) = pem::parse_many(data) else {
        return false;
    };
    blocks
        .iter()
        .find(|block| {
            matches!(
                block.tag(),
                "PRIVATE KEY" | "RSA PRIVATE KEY" | "EC PRIVATE KEY"
            )
        })
        .is_some_and(|block| {
            matches!(
                x509_parser::der_parser::parse_der(block.contents()),
                Ok((rest, _)) if rest.is_empty()
            )
        })
}
