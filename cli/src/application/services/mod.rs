//! Application services: use-case orchestration.
//!
//! Each service module implements one part of the setup by composing domain
//! logic with port trait calls. Services import only from `crate::domain` and
//! `crate::application::ports`, never from `crate::infra`, `crate::commands`,
//! or `crate::output`.

pub mod account;
pub mod configure;
pub mod input;
pub mod poll;
pub mod provision;
pub mod readiness;
pub mod setup;
