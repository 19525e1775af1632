// src/core/response_processor.rs

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // A response that is, as a whole, one fenced block: opening fence with an
    // optional language tag, body, closing fence on the last line.
    static ref OUTER_FENCE_RE: Regex =
        Regex::new(r"(?s)\A```[^\n`]*\n(.*)\n```[ \t]*\z").expect("outer fence regex is valid");
    // `[label](url)`
    static ref LINK_RE: Regex =
        Regex::new(r"\[([^\]]+)\]\([^)]+\)").expect("link regex is valid");
}

/// Normalizes generated text before it is shown or stored.
///
/// - Unwraps a response that is entirely one fenced code block. Fences inside
///   a larger response are left alone, as are unterminated fences.
/// - Reduces every markdown link to its label.
/// - Trims surrounding whitespace.
///
/// Total: any input produces an output, and unexpected shapes pass through unchanged.
pub fn process(text: &str) -> String {
    let unfenced = strip_outer_fence(text.trim());
    let unlinked = shorten_links(unfenced);
    unlinked.trim().to_string()
}

/// Returns the body of a fully fenced response, or the input itself.
pub fn strip_outer_fence(text: &str) -> &str {
    OUTER_FENCE_RE
        .captures(text)
        .and_then(|captures| captures.get(1))
        .map_or(text, |body| body.as_str())
}

/// Replaces `[label](url)` with `label`, repeating until no link is left, so
/// that links nested in a label are reduced as well.
pub fn shorten_links(text: &str) -> String {
    let mut current = text.to_string();
    loop {
        let next = LINK_RE.replace_all(&current, "$1");
        if next == current {
            return current;
        }
        current = next.into_owned();
    }
}
