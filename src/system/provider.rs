// src/system/provider.rs

use crate::{
    constants::API_KEY_ENV,
    models::{Message, ModelParameters},
};
use serde_json::Value;
use thiserror::Error;

/// What the backend produced for one request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationResponse {
    /// Generated text, unprocessed. Empty when the backend only returned an image.
    pub text: String,
    /// Decoded image bytes, when an image generation tool was used.
    pub image: Option<Vec<u8>>,
    /// The model that actually served the request, as reported by the backend.
    pub model: Option<String>,
    /// Token usage as reported by the backend, for the verbose dump.
    pub usage: Option<Value>,
}

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error(
        "API key not found. Set the {env} environment variable or add `api_key` to config.toml.",
        env = API_KEY_ENV
    )]
    MissingApiKey,
    #[error("API authentication failed: {0}")]
    Authentication(String),
    #[error("API rate limit exceeded: {0}")]
    RateLimited(String),
    #[error("API request failed with status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("API request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Unexpected API response: {0}")]
    InvalidResponse(String),
}

/// A generative-language backend.
pub trait Provider {
    /// Sends the whole conversation with the merged parameters and waits for the answer.
    fn generate(
        &self,
        messages: &[Message],
        parameters: &ModelParameters,
    ) -> Result<GenerationResponse, ProviderError>;
}
