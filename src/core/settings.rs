//! # Settings
//!
//! Loads the user's `config.toml`. Resolution is layered, later layers win:
//! built-in defaults < the TOML file < environment variables.
//! A missing file is created with the defaults so the user has something to edit.

use crate::{
    constants::{
        API_KEY_ENV, CONVERSATION_FILENAME, DEFAULT_API_BASE, DEFAULT_CODE,
        DEFAULT_MAX_OUTPUT_TOKENS, DEFAULT_SHELL, DEFAULT_TEMPERATURE, FULL_MODEL,
        LONGER_MAX_OUTPUT_TOKENS, MAX_OUTPUT_TOKENS_KEY, MINI_MODEL, MODEL_KEY, TEMPERATURE_KEY,
    },
    core::paths::{self, PathError},
    models::ModelParameters,
};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Could not access settings file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Settings file '{path}' is not valid TOML: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("Failed to serialize default settings: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error(transparent)]
    Path(#[from] PathError),
}

/// User-tunable configuration. Every field is optional in the file.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Model used by the cheap commands and as the built-in default.
    pub mini_model: String,
    /// Model used by the `code` command.
    pub full_model: String,
    /// Language assumed by the `code` command.
    pub default_code: String,
    /// Shell assumed by the `shell` command.
    pub default_shell: String,
    pub max_output_tokens: u64,
    /// Token limit applied when the `longer` option is set.
    pub longer_max_output_tokens: u64,
    pub temperature: f64,
    pub api_base: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Path template of the conversation record. Defaults to `<data dir>/conversation.json`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_file: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            mini_model: MINI_MODEL.to_string(),
            full_model: FULL_MODEL.to_string(),
            default_code: DEFAULT_CODE.to_string(),
            default_shell: DEFAULT_SHELL.to_string(),
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            longer_max_output_tokens: LONGER_MAX_OUTPUT_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            api_base: DEFAULT_API_BASE.to_string(),
            api_key: None,
            state_file: None,
        }
    }
}

impl Settings {
    /// Reads the settings at `path`, writing a default file first if none exists.
    pub fn load_or_create(path: &Path) -> Result<Self, SettingsError> {
        if !path.exists() {
            log::debug!("No settings at '{}'. Writing defaults.", path.display());
            let defaults = Self::default();
            let toml_string = toml::to_string_pretty(&defaults)?;
            fs::write(path, toml_string).map_err(|source| SettingsError::Io {
                path: path.display().to_string(),
                source,
            })?;
            return Ok(defaults);
        }

        let content = fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| SettingsError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Applies the environment layer. `lookup` is injected so tests don't touch the process env.
    pub fn with_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(key) = lookup(API_KEY_ENV).filter(|k| !k.trim().is_empty()) {
            self.api_key = Some(key);
        }
        self
    }

    /// The bottom layer of every parameter merge.
    pub fn default_parameters(&self) -> ModelParameters {
        ModelParameters::new()
            .with(MODEL_KEY, self.mini_model.as_str())
            .with(MAX_OUTPUT_TOKENS_KEY, self.max_output_tokens)
            .with(TEMPERATURE_KEY, self.temperature)
    }

    /// Where the conversation record lives.
    pub fn conversation_path(&self, data_dir: &Path) -> Result<PathBuf, PathError> {
        match &self.state_file {
            Some(template) => paths::expand_path_template(template),
            None => Ok(data_dir.join(CONVERSATION_FILENAME)),
        }
    }
}
