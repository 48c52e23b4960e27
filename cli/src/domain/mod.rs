//! Domain layer: setup types, validation and text transforms.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, or `std::net` sockets.
//! All functions are synchronous and take data in, returning data out.

pub mod config;
pub mod error;
pub mod host;
pub mod pillar;
pub mod prompt;
pub mod registration;
pub mod sysconfig;
pub mod validate;

pub use config::{CertificateSource, Configuration, Mode, Registration, SetupRequest};
pub use error::SetupError;
pub use registration::RegistrationOutcome;
pub use validate::{ValidationResult, normalize_email, validate_email, validate_password};
