// src/models.rs

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use crate::constants::MAX_OUTPUT_TOKENS_KEY;

// --- CONVERSATION MODELS ---
// These are persisted verbatim in the conversation record and sent to the provider.

/// The author of a message in a conversation.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The instruction that frames the whole conversation. Older records call it `system`.
    #[serde(alias = "system")]
    Developer,
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Developer => "Developer",
            Self::User => "User",
            Self::Assistant => "Assistant",
        };
        f.write_str(label)
    }
}

/// A single turn of a conversation, or a single entry of a command template.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// A flat, ordered mapping of model parameters (model identifier, token limit,
/// temperature and any backend-specific knobs such as `tools`).
///
/// Ordering is deterministic so that verbose dumps and persisted records are stable.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(transparent)]
pub struct ModelParameters(BTreeMap<String, Value>);

impl ModelParameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insertion, used to declare command overrides.
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.0.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Applies `other` on top of `self`: every key present in `other` replaces
    /// the value in `self`; keys only in `self` survive.
    pub fn layer(&mut self, other: &Self) {
        for (key, value) in &other.0 {
            self.0.insert(key.clone(), value.clone());
        }
    }

    pub fn max_output_tokens(&self) -> Option<u64> {
        self.get(MAX_OUTPUT_TOKENS_KEY).and_then(Value::as_u64)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

/// The single persisted record of the running conversation.
///
/// Every field is defaulted on read so that a record written by an older
/// version (or a partially written one) still loads.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ConversationState {
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default, rename = "model_args")]
    pub model_parameters: ModelParameters,
    #[serde(default)]
    pub clip_output: bool,
}

// --- REGISTRY MODELS ---

/// Declares a command: the flags that select it, the messages it sends and the
/// parameters it overrides. A command with no flags is the default/follow-up command.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandSpec {
    pub flags: Vec<String>,
    pub description: String,
    pub template: Vec<Message>,
    pub model_overrides: ModelParameters,
    pub clip_output: bool,
}

impl CommandSpec {
    /// Starts a command declaration with no template, no overrides and `clip_output = false`.
    pub fn new(flags: &[&str], description: impl Into<String>) -> Self {
        Self {
            flags: flags.iter().map(|f| f.to_string()).collect(),
            description: description.into(),
            template: Vec::new(),
            model_overrides: ModelParameters::new(),
            clip_output: false,
        }
    }

    pub fn message(mut self, role: Role, content: impl Into<String>) -> Self {
        self.template.push(Message::new(role, content));
        self
    }

    pub fn overrides(mut self, model_overrides: ModelParameters) -> Self {
        self.model_overrides = model_overrides;
        self
    }

    pub fn clip_output(mut self, clip_output: bool) -> Self {
        self.clip_output = clip_output;
        self
    }

    pub fn is_default(&self) -> bool {
        self.flags.is_empty()
    }

    pub fn has_flag(&self, flag: &str) -> bool {
        self.flags.iter().any(|f| f == flag)
    }
}

/// Declares a boolean option and the flags that set it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionSpec {
    pub name: String,
    pub flags: Vec<String>,
    pub description: String,
}

impl OptionSpec {
    pub fn new(name: &str, flags: &[&str], description: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            flags: flags.iter().map(|f| f.to_string()).collect(),
            description: description.into(),
        }
    }

    pub fn has_flag(&self, flag: &str) -> bool {
        self.flags.iter().any(|f| f == flag)
    }
}

// --- INVOCATION MODELS ---

/// The boolean options of one invocation, keyed by option name.
/// Every registered option is present; unset options are `false`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptionSet(BTreeMap<String, bool>);

impl OptionSet {
    /// Creates a set with every given option name present and unset.
    pub fn unset<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        Self(names.into_iter().map(|n| (n.to_string(), false)).collect())
    }

    pub fn enable(&mut self, name: &str) {
        self.0.insert(name.to_string(), true);
    }

    pub fn is_set(&self, name: &str) -> bool {
        self.0.get(name).copied().unwrap_or(false)
    }

    /// Names of the options that are set, in name order.
    pub fn enabled(&self) -> impl Iterator<Item = &str> {
        self.0.iter().filter(|(_, on)| **on).map(|(n, _)| n.as_str())
    }
}

/// The structured result of classifying the command line.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedInvocation<'r> {
    /// The command selected by flag, or `None` when the default command applies.
    pub command: Option<&'r CommandSpec>,
    pub text: String,
    pub options: OptionSet,
}
