// src/cli/dispatcher.rs

use anyhow::{Context, Result};
use std::time::Instant;

use crate::{
    constants::{OPT_LONGER, OPT_NO_CLIP, OPT_OVERWRITE, OPT_VERBOSE},
    core::{
        arg_parser::{self, Classification},
        conversation_store::ConversationStore,
        overwrite::{self, OverwriteError},
        prompt_builder::PromptBuilder,
        registry::Registry,
        response_processor,
        settings::Settings,
    },
    models::{ConversationState, Message},
    system::{
        presenter::{self, Presenter},
        provider::Provider,
    },
};

/// How an invocation ended, when it didn't fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The user asked for usage information; nothing else happened.
    Help,
    /// A full round trip completed and the conversation was saved.
    Completed,
}

/// Runs one invocation from raw arguments to presented output.
///
/// State is read at most once (only for the default command) and written exactly
/// once, after the provider answered. Any failure before that leaves the stored
/// conversation as it was.
pub struct Dispatcher<'a> {
    registry: &'a Registry,
    settings: &'a Settings,
    store: &'a dyn ConversationStore,
    provider: &'a dyn Provider,
    presenter: &'a mut dyn Presenter,
}

impl std::fmt::Debug for Dispatcher<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("registry", self.registry)
            .field("settings", self.settings)
            .finish_non_exhaustive()
    }
}

impl<'a> Dispatcher<'a> {
    pub fn new(
        registry: &'a Registry,
        settings: &'a Settings,
        store: &'a dyn ConversationStore,
        provider: &'a dyn Provider,
        presenter: &'a mut dyn Presenter,
    ) -> Self {
        Self {
            registry,
            settings,
            store,
            provider,
            presenter,
        }
    }

    pub fn dispatch(&mut self, args: &[String]) -> Result<Outcome> {
        log::debug!("Dispatching args: {:?}", args);

        let parsed = match arg_parser::classify(args, self.registry)? {
            Classification::Help => return Ok(Outcome::Help),
            Classification::Invoke(parsed) => parsed,
        };
        let longer = parsed.options.is_set(OPT_LONGER);

        // --- Prompt construction ---
        let defaults = self.settings.default_parameters();
        let builder = PromptBuilder::new(&defaults, self.settings.longer_max_output_tokens);
        let prompt = match parsed.command {
            Some(command) => {
                // A templated command starts a new conversation: there is no exchange to replace.
                if parsed.options.is_set(OPT_OVERWRITE) {
                    return Err(OverwriteError::NoPreviousCommand.into());
                }
                builder.templated(command, &parsed.text, longer)
            }
            None => {
                let previous = self.store.load();
                let history = if parsed.options.is_set(OPT_OVERWRITE) {
                    overwrite::drop_last_exchange(&previous.messages)?
                } else {
                    previous.messages.clone()
                };
                builder.follow_up(
                    self.registry.default_command(),
                    &previous,
                    history,
                    &parsed.text,
                    longer,
                )
            }
        };

        // --- Round trip ---
        let started = Instant::now();
        let response = self.provider.generate(&prompt.messages, &prompt.parameters)?;
        log::debug!(
            "Provider answered in {} ms (model: {})",
            started.elapsed().as_millis(),
            response.model.as_deref().unwrap_or("unknown")
        );
        let text = response_processor::process(&response.text);
        let image_path = response
            .image
            .as_ref()
            .map(|_| presenter::image_file_name(&parsed.text));

        let assistant_turn = match &image_path {
            Some(path) if text.is_empty() => format!("[image saved to {}]", path.display()),
            Some(path) => format!("{text}\n[image saved to {}]", path.display()),
            None => text.clone(),
        };

        let mut messages = prompt.messages;
        messages.push(Message::assistant(assistant_turn));
        let state = ConversationState {
            messages,
            model_parameters: prompt.parameters,
            clip_output: prompt.clip_output,
        };

        // A failed image write must leave the conversation unsaved.
        if let (Some(path), Some(bytes)) = (&image_path, &response.image) {
            self.presenter
                .save_image(path, bytes)
                .with_context(|| format!("Could not save image to '{}'", path.display()))?;
        }
        self.store
            .save(&state)
            .context("The response was received but the conversation could not be saved")?;

        // --- Presentation ---
        if parsed.options.is_set(OPT_VERBOSE) {
            self.presenter
                .verbose(&state.model_parameters, &state.messages, response.usage.as_ref());
        } else if image_path.is_none() {
            self.presenter.print(&text);
        }

        if image_path.is_none() && state.clip_output && !parsed.options.is_set(OPT_NO_CLIP) {
            self.presenter.copy(&text);
        }

        Ok(Outcome::Completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        constants::{MAX_OUTPUT_TOKENS_KEY, MODEL_KEY},
        core::{arg_parser::ArgumentError, conversation_store::MemoryStore},
        models::{ModelParameters, Role},
        system::provider::{GenerationResponse, ProviderError},
    };
    use serde_json::{Value, json};
    use std::{cell::RefCell, io, path::Path, path::PathBuf};

    /// Answers every request with the same response and records what it was sent.
    struct ScriptedProvider {
        reply: Result<GenerationResponse, String>,
        calls: RefCell<Vec<(Vec<Message>, ModelParameters)>>,
    }

    impl ScriptedProvider {
        fn text(text: &str) -> Self {
            Self {
                reply: Ok(GenerationResponse {
                    text: text.to_string(),
                    ..GenerationResponse::default()
                }),
                calls: RefCell::new(Vec::new()),
            }
        }

        fn image(bytes: &[u8]) -> Self {
            Self {
                reply: Ok(GenerationResponse {
                    image: Some(bytes.to_vec()),
                    ..GenerationResponse::default()
                }),
                calls: RefCell::new(Vec::new()),
            }
        }

        fn failing(reason: &str) -> Self {
            Self {
                reply: Err(reason.to_string()),
                calls: RefCell::new(Vec::new()),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.borrow().len()
        }

        fn last_call(&self) -> (Vec<Message>, ModelParameters) {
            self.calls.borrow().last().cloned().unwrap()
        }
    }

    impl Provider for ScriptedProvider {
        fn generate(
            &self,
            messages: &[Message],
            parameters: &ModelParameters,
        ) -> Result<GenerationResponse, ProviderError> {
            self.calls
                .borrow_mut()
                .push((messages.to_vec(), parameters.clone()));
            self.reply
                .clone()
                .map_err(|reason| ProviderError::Status {
                    status: 500,
                    body: reason,
                })
        }
    }

    #[derive(Default)]
    struct RecordingPresenter {
        printed: Vec<String>,
        copied: Vec<String>,
        verbose_dumps: usize,
        images: Vec<(PathBuf, Vec<u8>)>,
        fail_image_writes: bool,
    }

    impl Presenter for RecordingPresenter {
        fn verbose(&mut self, _: &ModelParameters, _: &[Message], _: Option<&Value>) {
            self.verbose_dumps += 1;
        }

        fn print(&mut self, text: &str) {
            self.printed.push(text.to_string());
        }

        fn copy(&mut self, text: &str) {
            self.copied.push(text.to_string());
        }

        fn save_image(&mut self, path: &Path, bytes: &[u8]) -> io::Result<()> {
            if self.fail_image_writes {
                return Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only"));
            }
            self.images.push((path.to_path_buf(), bytes.to_vec()));
            Ok(())
        }
    }

    fn args(params: &[&str]) -> Vec<String> {
        params.iter().map(|s| s.to_string()).collect()
    }

    fn user_turns(messages: &[Message]) -> usize {
        messages.iter().filter(|m| m.role == Role::User).count()
    }

    /// A conversation that went through two exchanges.
    fn two_turn_state() -> ConversationState {
        ConversationState {
            messages: vec![
                Message::new(Role::Developer, "You are a coding assistant."),
                Message::user("sort a list"),
                Message::assistant("sorted(xs)"),
                Message::user("in reverse"),
                Message::assistant("sorted(xs, reverse=True)"),
            ],
            model_parameters: ModelParameters::new()
                .with(MODEL_KEY, "gpt-4.1")
                .with(MAX_OUTPUT_TOKENS_KEY, 1024),
            clip_output: true,
        }
    }

    fn run(
        params: &[&str],
        store: &MemoryStore,
        provider: &ScriptedProvider,
        presenter: &mut RecordingPresenter,
    ) -> Result<Outcome> {
        let settings = Settings::default();
        let registry = Registry::builtin(&settings).unwrap();
        let mut dispatcher = Dispatcher::new(&registry, &settings, store, provider, presenter);
        dispatcher.dispatch(&args(params))
    }

    #[test]
    fn test_new_command_starts_a_conversation() {
        let store = MemoryStore::new();
        let provider = ScriptedProvider::text("```python\nsorted(xs)\n```");
        let mut presenter = RecordingPresenter::default();

        let outcome = run(&["-c", "sort", "a", "list"], &store, &provider, &mut presenter).unwrap();

        assert_eq!(outcome, Outcome::Completed);
        let (sent, params) = provider.last_call();
        assert_eq!(sent.len(), 2);
        assert!(sent.get(1).unwrap().content.contains("task: sort a list."));
        assert_eq!(params.get(MODEL_KEY), Some(&json!("gpt-4.1")));

        let saved = store.snapshot().unwrap();
        assert_eq!(saved.messages.len(), 3);
        assert_eq!(
            saved.messages.iter().map(|m| m.role).collect::<Vec<_>>(),
            vec![Role::Developer, Role::User, Role::Assistant]
        );
        assert_eq!(saved.messages.last().unwrap().content, "sorted(xs)");
        assert!(saved.clip_output);
        assert_eq!(saved.model_parameters, params);

        assert_eq!(presenter.printed, vec!["sorted(xs)".to_string()]);
        assert_eq!(presenter.copied, vec!["sorted(xs)".to_string()]);
    }

    #[test]
    fn test_follow_up_continues_previous_conversation() {
        let store = MemoryStore::with_state(two_turn_state());
        let provider = ScriptedProvider::text("sorted(xs, key=len)");
        let mut presenter = RecordingPresenter::default();

        run(&["by", "length"], &store, &provider, &mut presenter).unwrap();

        let (sent, params) = provider.last_call();
        assert_eq!(sent.len(), 6);
        assert_eq!(sent.last().unwrap(), &Message::user("by length"));
        // The previous parameters outrank the built-in defaults.
        assert_eq!(params.get(MODEL_KEY), Some(&json!("gpt-4.1")));

        let saved = store.snapshot().unwrap();
        assert_eq!(saved.messages.len(), 7);
        assert_eq!(user_turns(&saved.messages), 3);
        assert!(saved.clip_output);
    }

    #[test]
    fn test_overwrite_replaces_the_last_exchange() {
        let store = MemoryStore::with_state(two_turn_state());
        let provider = ScriptedProvider::text("sorted(xs)[::-1]");
        let mut presenter = RecordingPresenter::default();

        run(&["more", "detail", "-o"], &store, &provider, &mut presenter).unwrap();

        // The shortened history is what the provider sees.
        let (sent, _) = provider.last_call();
        assert_eq!(
            sent,
            vec![
                Message::new(Role::Developer, "You are a coding assistant."),
                Message::user("sort a list"),
                Message::assistant("sorted(xs)"),
                Message::user("more detail"),
            ]
        );

        let saved = store.snapshot().unwrap();
        assert_eq!(user_turns(&saved.messages), user_turns(&two_turn_state().messages));
        assert_eq!(saved.messages.len(), 5);
        assert_eq!(saved.messages.last().unwrap().content, "sorted(xs)[::-1]");
    }

    #[test]
    fn test_overwrite_without_previous_command_fails_before_calling_provider() {
        let state = ConversationState {
            messages: vec![Message::user("q1"), Message::assistant("a1")],
            ..ConversationState::default()
        };
        let store = MemoryStore::with_state(state.clone());
        let provider = ScriptedProvider::text("unused");
        let mut presenter = RecordingPresenter::default();

        let err = run(&["again", "-o"], &store, &provider, &mut presenter).unwrap_err();

        assert_eq!(
            err.downcast_ref::<OverwriteError>(),
            Some(&OverwriteError::NoPreviousCommand)
        );
        assert_eq!(provider.call_count(), 0);
        assert_eq!(store.save_count(), 0);
        assert_eq!(store.snapshot(), Some(state));
    }

    #[test]
    fn test_overwrite_with_a_command_fails() {
        let store = MemoryStore::with_state(two_turn_state());
        let provider = ScriptedProvider::text("unused");
        let mut presenter = RecordingPresenter::default();

        let err = run(&["-s", "list", "files", "-o"], &store, &provider, &mut presenter).unwrap_err();

        assert!(err.downcast_ref::<OverwriteError>().is_some());
        assert_eq!(provider.call_count(), 0);
        assert_eq!(store.save_count(), 0);
    }

    #[test]
    fn test_argument_error_leaves_state_untouched() {
        let store = MemoryStore::with_state(two_turn_state());
        let provider = ScriptedProvider::text("unused");
        let mut presenter = RecordingPresenter::default();

        let err = run(&["text", "-c"], &store, &provider, &mut presenter).unwrap_err();

        assert_eq!(
            err.downcast_ref::<ArgumentError>(),
            Some(&ArgumentError::CommandNotFirst)
        );
        assert_eq!(provider.call_count(), 0);
        assert_eq!(store.snapshot(), Some(two_turn_state()));
    }

    #[test]
    fn test_provider_failure_persists_nothing() {
        let store = MemoryStore::with_state(two_turn_state());
        let provider = ScriptedProvider::failing("backend down");
        let mut presenter = RecordingPresenter::default();

        let err = run(&["and", "then?"], &store, &provider, &mut presenter).unwrap_err();

        assert!(err.downcast_ref::<ProviderError>().is_some());
        assert_eq!(store.save_count(), 0);
        assert_eq!(store.snapshot(), Some(two_turn_state()));
        assert!(presenter.printed.is_empty());
    }

    #[test]
    fn test_help_does_nothing_else() {
        let store = MemoryStore::new();
        let provider = ScriptedProvider::text("unused");
        let mut presenter = RecordingPresenter::default();

        assert_eq!(run(&[], &store, &provider, &mut presenter).unwrap(), Outcome::Help);
        assert_eq!(run(&["--help"], &store, &provider, &mut presenter).unwrap(), Outcome::Help);
        assert_eq!(provider.call_count(), 0);
        assert!(store.snapshot().is_none());
    }

    #[test]
    fn test_longer_and_no_clip_and_verbose() {
        let store = MemoryStore::new();
        let provider = ScriptedProvider::text("echo hi");
        let mut presenter = RecordingPresenter::default();

        run(&["-s", "say", "hi", "-lnv"], &store, &provider, &mut presenter).unwrap();

        let (_, params) = provider.last_call();
        assert_eq!(params.max_output_tokens(), Some(4096));
        assert!(presenter.copied.is_empty());
        assert!(presenter.printed.is_empty());
        assert_eq!(presenter.verbose_dumps, 1);
    }

    #[test]
    fn test_commands_without_clip_output_are_not_copied() {
        let store = MemoryStore::new();
        let provider = ScriptedProvider::text("It means X. [src](https://x.y)");
        let mut presenter = RecordingPresenter::default();

        run(&["-e", "what", "is", "x"], &store, &provider, &mut presenter).unwrap();

        assert_eq!(presenter.printed, vec!["It means X. src".to_string()]);
        assert!(presenter.copied.is_empty());
        assert!(!store.snapshot().unwrap().clip_output);
    }

    #[test]
    fn test_image_response_is_saved_not_printed() {
        let store = MemoryStore::new();
        let provider = ScriptedProvider::image(b"PNG");
        let mut presenter = RecordingPresenter::default();

        run(&["-i", "a", "red", "fox!"], &store, &provider, &mut presenter).unwrap();

        assert!(presenter.printed.is_empty());
        assert!(presenter.copied.is_empty());
        assert_eq!(
            presenter.images,
            vec![(PathBuf::from("q_a_red_fox.png"), b"PNG".to_vec())]
        );
        let saved = store.snapshot().unwrap();
        assert_eq!(
            saved.messages.last().unwrap(),
            &Message::assistant("[image saved to q_a_red_fox.png]")
        );
        assert!(saved.model_parameters.get("tools").is_some());
    }

    #[test]
    fn test_failed_image_write_persists_nothing() {
        let store = MemoryStore::with_state(two_turn_state());
        let provider = ScriptedProvider::image(b"PNG");
        let mut presenter = RecordingPresenter {
            fail_image_writes: true,
            ..RecordingPresenter::default()
        };

        let err = run(&["-i", "a", "fox"], &store, &provider, &mut presenter).unwrap_err();

        assert!(err.to_string().contains("q_a_fox.png"));
        assert_eq!(store.save_count(), 0);
        assert_eq!(store.snapshot(), Some(two_turn_state()));
    }
}
