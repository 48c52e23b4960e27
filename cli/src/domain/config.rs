//! Setup request and resolved configuration.
//!
//! Plain data; no I/O.

use std::path::PathBuf;

/// Local part of the synthesized admin e-mail address.
pub const DEFAULT_ADMIN_LOCAL_PART: &str = "caasp-admin";

/// Raw values supplied on the command line, before any validation.
#[derive(Debug, Clone, Default)]
pub struct SetupRequest {
    pub ssl_crt: Option<PathBuf>,
    pub ssl_key: Option<PathBuf>,
    pub gen_ssl: bool,
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
    pub reg_email: Option<String>,
    pub reg_code: Option<String>,
    pub accept: bool,
    pub wizard: bool,
}

/// How the configuration gets filled in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Interactive: prompt for every field, re-prompt until valid.
    Wizard,
    /// Non-interactive: validate flags once, abort on the first failure.
    Arguments,
}

impl SetupRequest {
    /// Both halves of an explicit certificate pair were supplied.
    #[must_use]
    pub fn has_certificate_pair(&self) -> bool {
        self.ssl_crt.is_some() && self.ssl_key.is_some()
    }

    /// Wizard mode is used when asked for, or when the request does not say
    /// where the TLS material comes from.
    #[must_use]
    pub fn mode(&self) -> Mode {
        if self.wizard || !(self.has_certificate_pair() || self.gen_ssl) {
            Mode::Wizard
        } else {
            Mode::Arguments
        }
    }

    /// Registration flags, when both were supplied.
    #[must_use]
    pub fn registration(&self) -> Option<Registration> {
        match (&self.reg_email, &self.reg_code) {
            (Some(email), Some(code)) => Some(Registration {
                email: email.clone(),
                code: code.clone(),
            }),
            _ => None,
        }
    }
}

/// Where the dashboard's TLS material comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CertificateSource {
    /// Operator-supplied certificate and key files.
    Provided { crt: PathBuf, key: PathBuf },
    /// The activation script generates a self-signed pair.
    SelfSigned,
}

/// Update-service registration details.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub email: String,
    pub code: String,
}

/// Fully validated setup configuration. Immutable once provisioning starts.
#[derive(Debug, Clone)]
pub struct Configuration {
    pub certificate: CertificateSource,
    pub admin_email: String,
    pub admin_password: String,
    pub registration: Option<Registration>,
    pub accept: bool,
}

impl Configuration {
    #[must_use]
    pub fn self_signed(&self) -> bool {
        self.certificate == CertificateSource::SelfSigned
    }

    /// Rows shown before the operator confirms. The password is masked.
    #[must_use]
    pub fn summary(&self) -> Vec<(&'static str, String)> {
        let mut rows = match &self.certificate {
            CertificateSource::Provided { crt, key } => vec![
                ("SSL certificate:", crt.display().to_string()),
                ("SSL key:", key.display().to_string()),
            ],
            CertificateSource::SelfSigned => {
                vec![("SSL certificate:", "self-signed (generated)".to_string())]
            }
        };
        rows.push(("Admin e-mail:", self.admin_email.clone()));
        rows.push(("Admin password:", crate::domain::prompt::REDACTED.to_string()));
        match &self.registration {
            Some(reg) => {
                rows.push(("Registration e-mail:", reg.email.clone()));
                rows.push(("Registration code:", crate::domain::prompt::REDACTED.to_string()));
            }
            None => rows.push(("Registration:", "skipped".to_string())),
        }
        rows
    }
}

/// `caasp-admin@<fqdn>`, used when no admin e-mail was given.
#[must_use]
pub fn default_admin_email(fqdn: &str) -> String {
    format!("{DEFAULT_ADMIN_LOCAL_PART}@{fqdn}")
}
