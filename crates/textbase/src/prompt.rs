use std::{io, path::PathBuf};

use dialoguer::{Input, Password};

use crate::client::is_valid_bot_name;

/// Use the provided value, or ask for it interactively.
pub(crate) fn text(value: Option<String>, prompt: &str) -> io::Result<String> {
    match value {
        Some(value) => Ok(value),
        None => Input::new().with_prompt(prompt).interact_text(),
    }
}

/// Use the provided path, or ask for it interactively.
pub(crate) fn path(value: Option<PathBuf>, prompt: &str) -> io::Result<PathBuf> {
    match value {
        Some(value) => Ok(value),
        None => Input::<String>::new()
            .with_prompt(prompt)
            .interact_text()
            .map(PathBuf::from),
    }
}

/// Use the provided API key, or ask for it without echoing the input.
pub(crate) fn api_key(value: Option<String>) -> io::Result<String> {
    match value {
        Some(value) => Ok(value),
        None => Password::new().with_prompt("Textbase API Key").interact(),
    }
}

/// Use the provided bot name, or ask for one until a valid name is entered.
///
/// Names passed as flags are validated by the argument parser instead.
pub(crate) fn bot_name(value: Option<String>) -> io::Result<String> {
    match value {
        Some(value) => Ok(value),
        None => Input::new()
            .with_prompt("Name of the bot")
            .validate_with(|input: &String| {
                if is_valid_bot_name(input) {
                    Ok(())
                } else {
                    Err("Bot name can only contain lowercase alphanumeric characters, hyphens, and underscores.")
                }
            })
            .interact_text(),
    }
}
