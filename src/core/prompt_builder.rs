// src/core/prompt_builder.rs

use crate::{
    constants::{MAX_OUTPUT_TOKENS_KEY, TEXT_PLACEHOLDER},
    models::{CommandSpec, ConversationState, Message, ModelParameters},
};

/// Everything needed to call the provider for one invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    pub messages: Vec<Message>,
    pub parameters: ModelParameters,
    /// Whether the response should be copied to the clipboard (and remembered for follow-ups).
    pub clip_output: bool,
}

/// Renders messages and merges parameters.
///
/// Parameters are layered, later layers win:
/// built-in defaults < command overrides < previous parameters (follow-ups only)
/// < the `longer` token limit.
#[derive(Debug, Clone)]
pub struct PromptBuilder<'a> {
    defaults: &'a ModelParameters,
    longer_limit: u64,
}

impl<'a> PromptBuilder<'a> {
    pub fn new(defaults: &'a ModelParameters, longer_limit: u64) -> Self {
        Self {
            defaults,
            longer_limit,
        }
    }

    /// Starts a new conversation from a command's template.
    pub fn templated(&self, command: &CommandSpec, text: &str, longer: bool) -> Prompt {
        Prompt {
            messages: render_template(&command.template, text),
            parameters: self.merge(&command.model_overrides, None, longer),
            clip_output: command.clip_output,
        }
    }

    /// Continues `previous` with one new user turn containing `text` verbatim.
    ///
    /// `history` is the message sequence to continue. It is normally
    /// `previous.messages`, already shortened when the previous exchange is being overwritten.
    pub fn follow_up(
        &self,
        command: &CommandSpec,
        previous: &ConversationState,
        history: Vec<Message>,
        text: &str,
        longer: bool,
    ) -> Prompt {
        let mut messages = history;
        messages.push(Message::user(text));
        Prompt {
            messages,
            parameters: self.merge(
                &command.model_overrides,
                Some(&previous.model_parameters),
                longer,
            ),
            clip_output: previous.clip_output,
        }
    }

    fn merge(
        &self,
        overrides: &ModelParameters,
        previous: Option<&ModelParameters>,
        longer: bool,
    ) -> ModelParameters {
        let mut merged = self.defaults.clone();
        merged.layer(overrides);
        if let Some(previous) = previous {
            merged.layer(previous);
        }
        if longer {
            merged.set(MAX_OUTPUT_TOKENS_KEY, self.longer_limit);
        }
        merged
    }
}

/// Replaces every `{text}` in each message with `text`.
///
/// Plain substring replacement: nothing is escaped and the result is not scanned
/// again, so a `{text}` inside `text` itself stays as typed.
pub fn render_template(template: &[Message], text: &str) -> Vec<Message> {
    template
        .iter()
        .map(|msg| Message::new(msg.role, msg.content.replace(TEXT_PLACEHOLDER, text)))
        .collect()
}
