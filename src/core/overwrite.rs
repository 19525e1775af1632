// src/core/overwrite.rs

use crate::models::{Message, Role};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum OverwriteError {
    #[error("No previous command to overwrite.")]
    NoPreviousCommand,
}

/// Drops the most recent user/assistant exchange from `history` so that the
/// next user turn takes its place.
///
/// With `u` the user-turn indices of `history` plus the turn about to be
/// appended, the result is `history[..u[n-2]] + history[u[n-1]..]`: everything from
/// the last recorded user turn onward is discarded and the earlier turns,
/// including the leading developer instruction, are kept as they are.
///
/// # Errors
/// Returns [`OverwriteError::NoPreviousCommand`] when `history` holds fewer than
/// two user turns: the first exchange of a conversation cannot be overwritten.
pub fn drop_last_exchange(history: &[Message]) -> Result<Vec<Message>, OverwriteError> {
    let user_indices: Vec<usize> = history
        .iter()
        .enumerate()
        .filter(|(_, msg)| msg.role == Role::User)
        .map(|(i, _)| i)
        .collect();

    let last_user = match user_indices.as_slice() {
        [.., _, last] => *last,
        _ => return Err(OverwriteError::NoPreviousCommand),
    };

    log::debug!(
        "Overwriting exchange: dropping {} of {} messages.",
        history.len() - last_user,
        history.len()
    );
    Ok(history.iter().take(last_user).cloned().collect())
}
