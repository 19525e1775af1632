// src/core/arg_parser.rs

use crate::{
    constants::HELP_FLAGS,
    core::registry::Registry,
    models::{OptionSet, ParsedInvocation},
};
use thiserror::Error;

/// A malformed invocation. Always reported to the user, never retried.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ArgumentError {
    #[error("Only one command may be provided.")]
    MultipleCommands,
    #[error("Command must be the first argument.")]
    CommandNotFirst,
    #[error("Invalid command \"{0}\".")]
    InvalidCommand(String),
    #[error("No text provided.")]
    NoText,
    #[error("Invalid option \"{0}\".")]
    InvalidOption(String),
}

/// What the command line asks for.
#[derive(Debug, Clone, PartialEq)]
pub enum Classification<'r> {
    /// No arguments, or `-h`/`--help` first.
    Help,
    Invoke(ParsedInvocation<'r>),
}

/// Classifies the arguments that follow the program name.
///
/// # Logic:
/// - The command flag, if any, must be unique and come first.
/// - Options are peeled off the *end* of the remaining tokens: a trailing token
///   starting with `-` is either a known option flag or a bundle of single-letter
///   flags (`-vn`). Peeling stops at the first token that isn't option-shaped.
/// - A lone `-` is never an option, so it stays in the text. As the first token it
///   is still an invalid command.
/// - Everything left is joined with single spaces into the text.
///
/// # Errors
/// Returns the first failing check, in the order of the `ArgumentError` variants.
pub fn classify<'r>(
    tokens: &[String],
    registry: &'r Registry,
) -> Result<Classification<'r>, ArgumentError> {
    let Some((first, rest)) = tokens.split_first() else {
        return Ok(Classification::Help);
    };
    if HELP_FLAGS.contains(&first.as_str()) {
        return Ok(Classification::Help);
    }

    let command_count = tokens
        .iter()
        .filter(|token| registry.is_command_flag(token))
        .count();
    let command = registry.find_command(first);

    if command_count > 1 {
        return Err(ArgumentError::MultipleCommands);
    }
    if command_count == 1 && command.is_none() {
        return Err(ArgumentError::CommandNotFirst);
    }
    if command.is_none() && first.starts_with('-') {
        return Err(ArgumentError::InvalidCommand(first.clone()));
    }
    if command.is_some() && rest.is_empty() {
        return Err(ArgumentError::NoText);
    }

    let remaining = if command.is_some() { rest } else { tokens };
    let mut words: Vec<&str> = remaining.iter().map(String::as_str).collect();
    let mut options = OptionSet::unset(registry.options().iter().map(|opt| opt.name.as_str()));

    while let Some(&last) = words.last() {
        if !is_option_shaped(last) {
            break;
        }
        words.pop();
        apply_option_token(last, registry, &mut options)?;
    }

    let text = words.join(" ");
    if text.is_empty() {
        // e.g. `q -c -v`: the command had only options after it.
        return Err(ArgumentError::NoText);
    }

    log::debug!(
        "Classified command={:?} options={:?} text={:?}",
        command.and_then(|cmd| cmd.flags.first()),
        options.enabled().collect::<Vec<_>>(),
        text
    );

    Ok(Classification::Invoke(ParsedInvocation {
        command,
        text,
        options,
    }))
}

fn is_option_shaped(token: &str) -> bool {
    token.starts_with('-') && token != "-"
}

/// Sets the option(s) named by one trailing token.
fn apply_option_token(
    token: &str,
    registry: &Registry,
    options: &mut OptionSet,
) -> Result<(), ArgumentError> {
    // Individual flag (e.g. `-v`, `--verbose`).
    if let Some(option) = registry.find_option(token) {
        options.enable(&option.name);
        return Ok(());
    }

    // Combined flags (e.g. `-vn`).
    let bundle = token.strip_prefix('-').unwrap_or(token);
    for letter in bundle.chars() {
        let option = registry
            .find_option(&format!("-{letter}"))
            .ok_or_else(|| ArgumentError::InvalidOption(token.to_string()))?;
        options.enable(&option.name);
    }
    Ok(())
}
