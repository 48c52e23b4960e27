//! Infrastructure layer: concrete implementations of application port traits.
//!
//! This module contains all I/O-performing code: process execution, the
//! terminal, the filesystem, the container runtime, the salt master and the
//! cloud platforms.
//!
//! Imports from `crate::domain` and `crate::application::ports` are allowed.
//! Imports from `crate::commands` or `crate::output` are forbidden.

pub mod command_runner;
pub mod docker;
pub mod fs;
pub mod host;
pub mod platform;
pub mod prompter;
pub mod salt;
