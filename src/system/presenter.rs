// src/system/presenter.rs

use crate::{
    models::{Message, ModelParameters},
    system::clipboard,
};
use colored::Colorize;
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use serde_json::Value;
use std::{
    fs,
    io::{self, IsTerminal},
    path::{Path, PathBuf},
};

/// Shows the result of an invocation. Implementations never touch conversation state.
pub trait Presenter {
    /// Dumps the parameters, the full message history and the backend's usage report.
    fn verbose(&mut self, parameters: &ModelParameters, messages: &[Message], usage: Option<&Value>);

    /// Prints the processed response, formatted for the terminal.
    fn print(&mut self, text: &str);

    /// Copies the processed response to the clipboard. Failures are not errors.
    fn copy(&mut self, text: &str);

    /// Writes generated image bytes to `path`.
    fn save_image(&mut self, path: &Path, bytes: &[u8]) -> io::Result<()>;
}

/// Presents to the terminal: responses on stdout, everything else on stderr.
#[derive(Debug)]
pub struct TerminalPresenter {
    /// Stderr output (notices and the verbose dump) is only written when stdout
    /// is a terminal, so nothing besides the response reaches a pipe.
    interactive: bool,
}

impl TerminalPresenter {
    pub fn new() -> Self {
        Self {
            interactive: io::stdout().is_terminal(),
        }
    }

    /// Writes `message` to stderr when interactive. Returns whether it was written.
    fn side_channel(&self, message: &str) -> bool {
        if self.interactive {
            eprintln!("{message}");
        }
        self.interactive
    }

    fn notice(&self, message: &str) {
        self.side_channel(&message.yellow().to_string());
    }
}

impl Default for TerminalPresenter {
    fn default() -> Self {
        Self::new()
    }
}

impl Presenter for TerminalPresenter {
    fn verbose(&mut self, parameters: &ModelParameters, messages: &[Message], usage: Option<&Value>) {
        self.side_channel(&render_verbose(parameters, messages, usage));
    }

    fn print(&mut self, text: &str) {
        println!("{}", format_for_terminal(text));
    }

    fn copy(&mut self, text: &str) {
        match clipboard::copy(text) {
            Ok(()) => self.notice("Output copied to clipboard."),
            Err(e) => log::debug!("{}", e),
        }
    }

    fn save_image(&mut self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        fs::write(path, bytes)?;
        self.notice(&format!("Image saved to {}.", path.display()));
        Ok(())
    }
}

lazy_static! {
    static ref BASH_BLOCK_RE: Regex =
        Regex::new(r"(?s)```bash\n?(.*?)```").expect("bash block regex is valid");
    static ref CODE_BLOCK_RE: Regex =
        Regex::new(r"(?s)```(?:\w+\n?)?(.*?)```").expect("code block regex is valid");
    static ref INLINE_CODE_RE: Regex =
        Regex::new(r"`([^`]+)`").expect("inline code regex is valid");
    static ref BLANK_LINES_RE: Regex = Regex::new(r"\n{2,}").expect("blank lines regex is valid");
}

/// Terminal rendering of a processed response. Only applied to what is printed;
/// the stored turn and the clipboard get the unformatted text.
///
/// - `bash` blocks become cyan lines prefixed with `$ `.
/// - Other fenced blocks lose their fences and language tag and turn cyan.
/// - Inline code loses its backticks and turns cyan.
/// - Runs of blank lines collapse to a single one.
pub fn format_for_terminal(text: &str) -> String {
    let text = BASH_BLOCK_RE.replace_all(text, |caps: &Captures<'_>| {
        caps.get(1)
            .map_or("", |body| body.as_str())
            .trim()
            .split('\n')
            .map(|line| format!("$ {line}"))
            .collect::<Vec<_>>()
            .join("\n")
            .cyan()
            .to_string()
    });
    let text = CODE_BLOCK_RE.replace_all(&text, |caps: &Captures<'_>| {
        caps.get(1)
            .map_or("", |body| body.as_str())
            .trim()
            .cyan()
            .to_string()
    });
    let text = INLINE_CODE_RE.replace_all(&text, |caps: &Captures<'_>| {
        caps.get(1)
            .map_or("", |code| code.as_str())
            .cyan()
            .to_string()
    });
    BLANK_LINES_RE.replace_all(&text, "\n\n").into_owned()
}

/// Formats the verbose transcript.
pub fn render_verbose(
    parameters: &ModelParameters,
    messages: &[Message],
    usage: Option<&Value>,
) -> String {
    let mut lines = vec!["MODEL PARAMETERS:".red().to_string()];
    for (key, value) in parameters.iter() {
        lines.push(format!("{} {}", format!("{key}:").green(), display_value(value)));
    }

    lines.push(String::new());
    lines.push("MESSAGES:".red().to_string());
    for message in messages {
        lines.push(format!(
            "{} {}",
            format!("{}:", message.role).green(),
            message.content
        ));
    }

    if let Some(Value::Object(usage)) = usage {
        lines.push(String::new());
        lines.push("USAGE:".red().to_string());
        for (key, value) in usage {
            lines.push(format!("{} {}", format!("{key}:").green(), display_value(value)));
        }
    }

    lines.join("\n")
}

/// Strings are shown bare; everything else as compact JSON.
fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// The file a generated image is saved to: `q_<text without punctuation>.png`,
/// with spaces turned into underscores.
pub fn image_file_name(text: &str) -> PathBuf {
    let stem: String = text
        .chars()
        .filter(|c| !c.is_ascii_punctuation())
        .map(|c| if c == ' ' { '_' } else { c })
        .collect();
    PathBuf::from(format!("q_{stem}.png"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use serde_json::json;

    #[test]
    fn test_image_file_name() {
        assert_eq!(
            image_file_name("a cat, wearing a hat!"),
            PathBuf::from("q_a_cat_wearing_a_hat.png")
        );
    }

    #[test]
    fn test_render_verbose_lists_parameters_and_messages() {
        colored::control::set_override(false);
        let params = ModelParameters::new()
            .with("model", "gpt-4.1")
            .with("max_output_tokens", 1024)
            .with("tools", json!([{"type": "web_search_preview"}]));
        let messages = vec![
            Message::new(Role::Developer, "be brief"),
            Message::user("hi"),
            Message::assistant("hello"),
        ];

        let rendered = render_verbose(&params, &messages, Some(&json!({"output_tokens": 1})));

        assert!(rendered.starts_with("MODEL PARAMETERS:"));
        assert!(rendered.contains("model: gpt-4.1"));
        assert!(rendered.contains("max_output_tokens: 1024"));
        assert!(rendered.contains(r#"tools: [{"type":"web_search_preview"}]"#));
        assert!(rendered.contains("MESSAGES:\nDeveloper: be brief\nUser: hi\nAssistant: hello"));
        assert!(rendered.contains("USAGE:\noutput_tokens: 1"));
    }

    #[test]
    fn test_bash_blocks_become_prompt_lines() {
        colored::control::set_override(false);
        let text = "Run:\n```bash\nls -la\ncd /tmp\n```\ndone";
        assert_eq!(format_for_terminal(text), "Run:\n$ ls -la\n$ cd /tmp\ndone");
    }

    #[test]
    fn test_code_blocks_and_inline_code_lose_their_fences() {
        colored::control::set_override(false);
        let text = "Use:\n```python\nprint(1)\n```\nor `print(2)` instead.";
        assert_eq!(
            format_for_terminal(text),
            "Use:\nprint(1)\nor print(2) instead."
        );
        assert_eq!(format_for_terminal("```\nplain\n```"), "plain");
    }

    #[test]
    fn test_blank_line_runs_collapse() {
        assert_eq!(format_for_terminal("a\n\n\n\nb\n\nc\nd"), "a\n\nb\n\nc\nd");
    }

    #[test]
    fn test_plain_text_prints_unchanged() {
        let text = "git log --oneline | head -n 5";
        assert_eq!(format_for_terminal(text), text);
    }

    #[test]
    fn test_non_interactive_presenter_keeps_stderr_quiet() {
        let presenter = TerminalPresenter { interactive: false };
        assert!(!presenter.side_channel("MODEL PARAMETERS:"));

        let presenter = TerminalPresenter { interactive: true };
        assert!(presenter.side_channel("Output copied to clipboard."));
    }

    #[test]
    fn test_save_image_writes_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("q_cat.png");
        let mut presenter = TerminalPresenter { interactive: false };

        presenter.save_image(&path, b"PNG").unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"PNG");
    }
}
