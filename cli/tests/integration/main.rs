//! Integration tests for caasp-admin-setup
//!
//! These tests spawn the actual binary and check argument handling and the
//! failure paths that need no cloud instance.

mod cli_tests;
