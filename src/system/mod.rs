//! # System Interaction Layer
//!
//! This module holds the collaborators that talk to the world outside the engine.
//!
//! ## Modules
//!
//! - **`provider`**: The `Provider` trait every generative backend implements, plus
//!   the response and error types shared by all backends.
//! - **`openai`**: A `Provider` for the OpenAI Responses API over blocking HTTP.
//! - **`clipboard`**: Copying that survives the process exiting (a detached owner on Linux).
//! - **`presenter`**: The `Presenter` trait and the terminal implementation that prints,
//!   dumps verbose transcripts, copies to the clipboard and saves generated images.

pub mod clipboard;
pub mod openai;
pub mod presenter;
pub mod provider;
