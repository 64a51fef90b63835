use dialoguer::{Confirm, Input, Password};

use crate::error::DeployResult;

/// Source of interactive answers.
pub trait Prompter {
    /// Ask for a line of text. An empty answer returns `default`
    /// when one is given.
    fn input(&mut self, prompt: &str, default: Option<&str>) -> DeployResult<String>;

    /// Ask for a secret without echoing it. May return an empty
    /// string.
    fn secret(&mut self, prompt: &str) -> DeployResult<String>;

    /// Ask a yes/no question.
    fn confirm(&mut self, prompt: &str, default: bool) -> DeployResult<bool>;
}

/// Prompts on the controlling terminal.
#[derive(Debug, Default)]
pub struct Terminal;

impl Terminal {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Prompter for Terminal {
    fn input(&mut self, prompt: &str, default: Option<&str>) -> DeployResult<String> {
        let mut input = Input::<String>::new()
            .with_prompt(prompt)
            .allow_empty(true);
        if let Some(default) = default {
            input = input.default(default.to_string());
        }
        Ok(input.interact_text()?)
    }

    fn secret(&mut self, prompt: &str) -> DeployResult<String> {
        Ok(Password::new()
            .with_prompt(prompt)
            .allow_empty_password(true)
            .interact()?)
    }

    fn confirm(&mut self, prompt: &str, default: bool) -> DeployResult<bool> {
        Ok(Confirm::new()
            .with_prompt(prompt)
            .default(default)
            .interact()?)
    }
}
