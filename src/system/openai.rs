// src/system/openai.rs

use crate::{
    core::settings::Settings,
    models::{Message, ModelParameters},
    system::provider::{GenerationResponse, Provider, ProviderError},
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::{Map, Value};
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);
const ERROR_BODY_PREVIEW: usize = 240;

/// Talks to the OpenAI Responses API (`POST {api_base}/responses`).
#[derive(Debug)]
pub struct OpenAiProvider {
    client: reqwest::blocking::Client,
    api_base: String,
    api_key: Option<String>,
}

impl OpenAiProvider {
    /// Builds the HTTP client. A missing API key is only reported when a request is made,
    /// so that argument errors and help never depend on credentials.
    pub fn from_settings(settings: &Settings) -> Result<Self, ProviderError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            api_base: settings.api_base.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
        })
    }
}

impl Provider for OpenAiProvider {
    fn generate(
        &self,
        messages: &[Message],
        parameters: &ModelParameters,
    ) -> Result<GenerationResponse, ProviderError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(ProviderError::MissingApiKey)?;
        let body = request_body(messages, parameters)?;
        log::debug!("POST {}/responses with {} messages", self.api_base, messages.len());

        let response = self
            .client
            .post(format!("{}/responses", self.api_base))
            .bearer_auth(api_key)
            .json(&body)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body: String = response
                .text()
                .unwrap_or_default()
                .chars()
                .take(ERROR_BODY_PREVIEW)
                .collect();
            return Err(match status.as_u16() {
                401 | 403 => ProviderError::Authentication(body),
                429 => ProviderError::RateLimited(body),
                code => ProviderError::Status { status: code, body },
            });
        }

        let payload: Value = response.json()?;
        parse_response(&payload)
    }
}

/// The model parameters flattened into the request, plus the conversation as `input`.
fn request_body(
    messages: &[Message],
    parameters: &ModelParameters,
) -> Result<Value, ProviderError> {
    let mut body: Map<String, Value> = parameters
        .iter()
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();
    let input = serde_json::to_value(messages)
        .map_err(|e| ProviderError::InvalidResponse(format!("could not encode messages: {e}")))?;
    body.insert("input".to_string(), input);
    Ok(Value::Object(body))
}

/// Collects the text parts and the first generated image from a Responses API payload.
fn parse_response(payload: &Value) -> Result<GenerationResponse, ProviderError> {
    let output = payload
        .get("output")
        .and_then(Value::as_array)
        .ok_or_else(|| ProviderError::InvalidResponse("missing `output` array".to_string()))?;

    let mut text = String::new();
    let mut image = None;

    for item in output {
        match item.get("type").and_then(Value::as_str) {
            Some("message") => {
                let parts = item
                    .get("content")
                    .and_then(Value::as_array)
                    .map(Vec::as_slice)
                    .unwrap_or_default();
                for part in parts {
                    if part.get("type").and_then(Value::as_str) == Some("output_text")
                        && let Some(chunk) = part.get("text").and_then(Value::as_str)
                    {
                        text.push_str(chunk);
                    }
                }
            }
            Some("image_generation_call") if image.is_none() => {
                if let Some(encoded) = item.get("result").and_then(Value::as_str) {
                    let bytes = STANDARD.decode(encoded).map_err(|e| {
                        ProviderError::InvalidResponse(format!("image is not valid base64: {e}"))
                    })?;
                    image = Some(bytes);
                }
            }
            _ => {}
        }
    }

    Ok(GenerationResponse {
        text,
        image,
        model: payload.get("model").and_then(Value::as_str).map(str::to_string),
        usage: payload.get("usage").cloned(),
    })
}
