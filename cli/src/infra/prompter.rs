//! Terminal implementation of the `Prompter` port.

use anyhow::{Context, Result};
use dialoguer::{Input, Password};

use crate::application::ports::Prompter;

/// Reads answers from the controlling terminal via `dialoguer`.
///
/// Defaults are rendered into the prompt text by the caller, so empty input
/// is always allowed here.
pub struct DialoguerPrompter;

impl Prompter for DialoguerPrompter {
    fn read_line(&self, prompt: &str, secret: bool) -> Result<String> {
        if secret {
            Password::new()
                .with_prompt(prompt)
                .allow_empty_password(true)
                .interact()
                .context("reading secret from terminal")
        } else {
            Input::<String>::new()
                .with_prompt(prompt)
                .allow_empty(true)
                .interact_text()
                .context("reading answer from terminal")
        }
    }
}
