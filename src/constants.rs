// src/constants.rs

/// The name of the data directory created in the user's home (`~/.q`).
pub const DATA_DIR_NAME: &str = ".q";

/// Environment variable that relocates the data directory.
pub const DATA_DIR_ENV: &str = "Q_HOME";

/// The name of the configuration file (inside the data directory).
pub const SETTINGS_FILENAME: &str = "config.toml";

/// The name of the persisted conversation record (inside the data directory).
pub const CONVERSATION_FILENAME: &str = "conversation.json";

/// Set on the detached child process that owns the clipboard contents.
pub const CLIPBOARD_DAEMON_ENV: &str = "Q_CLIPBOARD_DAEMON";

/// Environment variable read for the provider credential.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// The reserved token substituted with the user's text in message templates.
pub const TEXT_PLACEHOLDER: &str = "{text}";

/// Flags that always request the help screen and can never be registered.
pub const HELP_FLAGS: &[&str] = &["-h", "--help"];

/// Cheap and fast model.
pub const MINI_MODEL: &str = "gpt-4.1-mini";

/// Expensive and more powerful model.
pub const FULL_MODEL: &str = "gpt-4.1";

pub const DEFAULT_MAX_OUTPUT_TOKENS: u64 = 1024;

/// Token limit applied by the `longer` option.
pub const LONGER_MAX_OUTPUT_TOKENS: u64 = 4096;

pub const DEFAULT_TEMPERATURE: f64 = 0.0;

/// Default language for code generation.
pub const DEFAULT_CODE: &str = "python";

/// Default system for shell command generation.
pub const DEFAULT_SHELL: &str = "debian+bash";

pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

/// Parameter keys with special meaning to the merge logic.
pub const MODEL_KEY: &str = "model";
pub const MAX_OUTPUT_TOKENS_KEY: &str = "max_output_tokens";
pub const TEMPERATURE_KEY: &str = "temperature";

/// Names of the built-in options, as keyed in an `OptionSet`.
pub const OPT_OVERWRITE: &str = "overwrite";
pub const OPT_NO_CLIP: &str = "no-clip";
pub const OPT_VERBOSE: &str = "verbose";
pub const OPT_LONGER: &str = "longer";
