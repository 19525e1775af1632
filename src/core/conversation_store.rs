//! # Conversation Store
//!
//! Persistence of the single running conversation. The whole contract is
//! `load`/`save`; the dispatcher only ever talks to the trait, so tests swap in
//! [`MemoryStore`] instead of touching the filesystem.
//!
//! No locking is done. Two concurrent invocations race and the later `save` wins.

use crate::models::ConversationState;
use std::{
    cell::RefCell,
    fs,
    io::Write,
    path::{Path, PathBuf},
};
use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Could not write conversation record '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to serialize conversation record: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub trait ConversationStore {
    /// Returns the last persisted state, or the empty state if there is none
    /// or it cannot be read. Never fails.
    fn load(&self) -> ConversationState;

    /// Replaces the persisted state as a whole.
    fn save(&self, state: &ConversationState) -> Result<(), StoreError>;
}

/// Stores the conversation as one pretty-printed JSON object on disk.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }
}

impl ConversationStore for JsonFileStore {
    fn load(&self) -> ConversationState {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("No conversation record at '{}'.", self.path.display());
                return ConversationState::default();
            }
            Err(e) => {
                log::warn!(
                    "Could not read conversation record '{}': {}. Starting fresh.",
                    self.path.display(),
                    e
                );
                return ConversationState::default();
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(state) => state,
            Err(e) => {
                log::warn!(
                    "Conversation record '{}' is corrupt: {}. Starting fresh.",
                    self.path.display(),
                    e
                );
                ConversationState::default()
            }
        }
    }

    /// Writes to a temporary file in the same directory and renames it over the
    /// record, so an interrupted write never leaves a half-written file behind.
    fn save(&self, state: &ConversationState) -> Result<(), StoreError> {
        let json = serde_json::to_vec_pretty(state)?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).map_err(|e| self.io_error(e))?;

        let mut temp = NamedTempFile::new_in(&dir).map_err(|e| self.io_error(e))?;
        temp.write_all(&json).map_err(|e| self.io_error(e))?;
        temp.flush().map_err(|e| self.io_error(e))?;
        temp.persist(&self.path).map_err(|e| self.io_error(e.error))?;

        log::debug!(
            "Saved {} messages to '{}'.",
            state.messages.len(),
            self.path.display()
        );
        Ok(())
    }
}

/// Keeps the conversation in memory. Used for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RefCell<Option<ConversationState>>,
    saves: RefCell<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that already holds `state`, as if a previous run saved it.
    pub fn with_state(state: ConversationState) -> Self {
        Self {
            state: RefCell::new(Some(state)),
            saves: RefCell::new(0),
        }
    }

    /// The currently stored state, if anything was ever stored.
    pub fn snapshot(&self) -> Option<ConversationState> {
        self.state.borrow().clone()
    }

    /// How many times `save` was called.
    pub fn save_count(&self) -> usize {
        *self.saves.borrow()
    }
}

impl ConversationStore for MemoryStore {
    fn load(&self) -> ConversationState {
        self.state.borrow().clone().unwrap_or_default()
    }

    fn save(&self, state: &ConversationState) -> Result<(), StoreError> {
        *self.state.borrow_mut() = Some(state.clone());
        *self.saves.borrow_mut() += 1;
        Ok(())
    }
}
