// src/core/registry.rs

use crate::{
    constants::{HELP_FLAGS, MODEL_KEY, OPT_LONGER, OPT_NO_CLIP, OPT_OVERWRITE, OPT_VERBOSE},
    core::settings::Settings,
    models::{CommandSpec, ModelParameters, OptionSpec, Role},
};
use serde_json::json;
use std::collections::HashSet;
use thiserror::Error;

/// Reasons a command/option table is refused at startup.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum RegistryError {
    #[error("No default command found.")]
    NoDefaultCommand,
    #[error(
        "More than one default command found. If a custom command was added, it is missing a flag."
    )]
    MultipleDefaultCommands,
    #[error("Duplicate commands found: {}.", .0.join(", "))]
    DuplicateCommandFlags(Vec<String>),
    #[error("Duplicate options found: {}.", .0.join(", "))]
    DuplicateOptionFlags(Vec<String>),
    #[error("Duplicate option names found: {}.", .0.join(", "))]
    DuplicateOptionNames(Vec<String>),
    #[error("Flags registered both as a command and as an option: {}.", .0.join(", "))]
    CommandOptionOverlap(Vec<String>),
    #[error("Flag '{0}' is reserved for help.")]
    ReservedFlag(String),
    #[error("Flag '{0}' must start with '-'.")]
    MalformedFlag(String),
}

/// The immutable, validated table of commands and options.
///
/// Built once at startup and passed by reference to the classifier and dispatcher.
#[derive(Debug, Clone)]
pub struct Registry {
    commands: Vec<CommandSpec>,
    options: Vec<OptionSpec>,
    default_index: usize,
}

impl Registry {
    /// Validates the given tables and freezes them into a registry.
    ///
    /// # Errors
    /// Fails unless exactly one command has no flags, every flag starts with a hyphen,
    /// no flag repeats within commands or within options, no flag appears in both
    /// tables and no flag shadows `-h`/`--help`.
    pub fn new(commands: Vec<CommandSpec>, options: Vec<OptionSpec>) -> Result<Self, RegistryError> {
        let defaults: Vec<usize> = commands
            .iter()
            .enumerate()
            .filter(|(_, cmd)| cmd.is_default())
            .map(|(i, _)| i)
            .collect();
        let default_index = match defaults.as_slice() {
            [] => return Err(RegistryError::NoDefaultCommand),
            [only] => *only,
            _ => return Err(RegistryError::MultipleDefaultCommands),
        };

        let command_flags: Vec<&str> = commands
            .iter()
            .flat_map(|cmd| cmd.flags.iter().map(String::as_str))
            .collect();
        let option_flags: Vec<&str> = options
            .iter()
            .flat_map(|opt| opt.flags.iter().map(String::as_str))
            .collect();

        for flag in command_flags.iter().chain(option_flags.iter()) {
            if HELP_FLAGS.contains(flag) {
                return Err(RegistryError::ReservedFlag(flag.to_string()));
            }
            // A bare "-" is always text, so it can't be a flag either.
            if !flag.starts_with('-') || *flag == "-" {
                return Err(RegistryError::MalformedFlag(flag.to_string()));
            }
        }

        let dup_commands = duplicates(&command_flags);
        if !dup_commands.is_empty() {
            return Err(RegistryError::DuplicateCommandFlags(dup_commands));
        }
        let dup_options = duplicates(&option_flags);
        if !dup_options.is_empty() {
            return Err(RegistryError::DuplicateOptionFlags(dup_options));
        }
        let option_names: Vec<&str> = options.iter().map(|opt| opt.name.as_str()).collect();
        let dup_names = duplicates(&option_names);
        if !dup_names.is_empty() {
            return Err(RegistryError::DuplicateOptionNames(dup_names));
        }

        let command_set: HashSet<&str> = command_flags.iter().copied().collect();
        let mut overlap: Vec<String> = option_flags
            .iter()
            .filter(|flag| command_set.contains(*flag))
            .map(|flag| flag.to_string())
            .collect();
        if !overlap.is_empty() {
            overlap.sort();
            return Err(RegistryError::CommandOptionOverlap(overlap));
        }

        Ok(Self {
            commands,
            options,
            default_index,
        })
    }

    /// The commands and options this tool ships with.
    pub fn builtin(settings: &Settings) -> Result<Self, RegistryError> {
        Self::new(builtin_commands(settings), builtin_options())
    }

    pub fn commands(&self) -> &[CommandSpec] {
        &self.commands
    }

    pub fn options(&self) -> &[OptionSpec] {
        &self.options
    }

    /// The single command without flags.
    pub fn default_command(&self) -> &CommandSpec {
        // `new` guarantees the index is in bounds.
        self.commands
            .get(self.default_index)
            .unwrap_or_else(|| unreachable!("default command index validated at construction"))
    }

    /// Finds the command selected by `flag`, if any.
    pub fn find_command(&self, flag: &str) -> Option<&CommandSpec> {
        self.commands.iter().find(|cmd| cmd.has_flag(flag))
    }

    /// Finds the option set by `flag`, if any.
    pub fn find_option(&self, flag: &str) -> Option<&OptionSpec> {
        self.options.iter().find(|opt| opt.has_flag(flag))
    }

    pub fn is_command_flag(&self, token: &str) -> bool {
        self.find_command(token).is_some()
    }
}

/// Flags occurring more than once, sorted for stable error messages.
fn duplicates(flags: &[&str]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut dups: Vec<String> = flags
        .iter()
        .filter(|flag| !seen.insert(**flag))
        .map(|flag| flag.to_string())
        .collect();
    dups.sort();
    dups.dedup();
    dups
}

fn builtin_commands(settings: &Settings) -> Vec<CommandSpec> {
    let mini = settings.mini_model.as_str();
    vec![
        CommandSpec::new(&[], "follow-up on the previous response"),
        CommandSpec::new(
            &["-e", "--explain"],
            "explain code, commands, or a technical concept",
        )
        .overrides(ModelParameters::new().with(MODEL_KEY, mini))
        .message(
            Role::Developer,
            "You are a programming assistant. Given a shell command, code snippet, or technical concept, provide a concise and technical explanation. Assume the reader is an experienced developer. Avoid restating the code or command. Avoid explaining obvious syntax. Avoid breaking the answer into bullet points unless necessary. The response should be a single short paragraph optimized for clarity.",
        )
        .message(Role::User, "Explain: {text}"),
        CommandSpec::new(
            &["-c", "--code"],
            format!("generate a code snippet (default: {})", settings.default_code),
        )
        .clip_output(true)
        .overrides(ModelParameters::new().with(MODEL_KEY, settings.full_model.as_str()))
        .message(
            Role::Developer,
            format!(
                "You are a coding assistant. Given a natural language description, generate a code snippet that accomplishes the requested task. The code should be correct, efficient, concise, and idiomatic. Respond with only the code snippet, without explanations, additional text, or formatting. Assume the programming language is {} unless otherwise specified.",
                settings.default_code
            ),
        )
        .message(
            Role::User,
            "Generate a code snippet to accomplish the following task: {text}. Respond only with the code, without explanation or additional text.",
        ),
        CommandSpec::new(
            &["-s", "--shell"],
            format!("generate a shell command (default: {})", settings.default_shell),
        )
        .clip_output(true)
        .message(
            Role::Developer,
            format!(
                "You are a command-line assistant. Given a natural language task description, generate the simplest single shell command that accomplishes the task. Favor minimal, commonly available commands with no extra formatting or piping. Avoid commands that could delete, overwrite, or modify important files or system settings (e.g., rm -rf, dd, mkfs, chmod -R, chown, kill -9). Respond with only the command, without explanations, additional text, or formatting. Assume a {} shell unless otherwise specified.",
                settings.default_shell
            ),
        )
        .message(
            Role::User,
            "Generate a single shell command to accomplish the following task: {text}. Respond with only the command, without explanation or additional text.",
        ),
        CommandSpec::new(&["-i", "--image"], "generate an image (very expensive)")
            .overrides(
                ModelParameters::new().with(MODEL_KEY, mini).with(
                    "tools",
                    json!([{ "type": "image_generation", "size": "1024x1024", "quality": "auto" }]),
                ),
            )
            .message(Role::User, "Generate an image of the following: {text}."),
        CommandSpec::new(&["-w", "--web"], "search the internet (expensive)")
            .overrides(ModelParameters::new().with(MODEL_KEY, mini).with(
                "tools",
                json!([{ "type": "web_search_preview", "search_context_size": "low" }]),
            ))
            .message(
                Role::Developer,
                "You fetch real-time data from the internet. Always respond with only the data requested. Do not provide additional information in the form of context, background, or links. The response should be less than a single sentence.",
            )
            .message(Role::User, "Fetch the following information: {text}."),
    ]
}

fn builtin_options() -> Vec<OptionSpec> {
    vec![
        OptionSpec::new(
            OPT_OVERWRITE,
            &["-o", "--overwrite"],
            "overwrite the previous command",
        ),
        OptionSpec::new(
            OPT_NO_CLIP,
            &["-n", "--no-clip"],
            "do not copy the output to the clipboard",
        ),
        OptionSpec::new(
            OPT_VERBOSE,
            &["-v", "--verbose"],
            "print the model parameters and message history",
        ),
        OptionSpec::new(
            OPT_LONGER,
            &["-l", "--longer"],
            "allow a longer response",
        ),
    ]
}
