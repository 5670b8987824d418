//! Chat-completion client for the OpenRouter API.
//!
//! Dataset matching and redaction both go through [`CompletionClient`], so the
//! HTTP implementation can be swapped for a scripted one in tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::config::LlmConfig;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("OPENROUTER_API_KEY not configured")]
    NotConfigured,

    #[error("LLM request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("LLM API error: {status} - {body}")]
    Status { status: u16, body: String },

    #[error("LLM response malformed: {0}")]
    MalformedResponse(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system: String,
    pub prompt: String,
    /// Overrides the client's default model
    pub model: Option<String>,
    pub temperature: Option<f32>,
}

impl CompletionRequest {
    pub fn new(system: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            prompt: prompt.into(),
            model: None,
            temperature: None,
        }
    }

    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.model = model;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Returns the assistant message content of the first choice.
    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError>;
}

pub type SharedLlm = Arc<dyn CompletionClient>;

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

pub struct OpenRouterClient {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
    default_model: String,
}

impl OpenRouterClient {
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            url: config.url.clone(),
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
            default_model: config.model.clone(),
        })
    }
}

#[async_trait]
impl CompletionClient for OpenRouterClient {
    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError> {
        let api_key = self.api_key.as_deref().ok_or(LlmError::NotConfigured)?;
        let model = request.model.as_deref().unwrap_or(&self.default_model);

        let body = ChatRequest {
            model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.prompt,
                },
            ],
            temperature: request.temperature,
        };

        tracing::debug!("LLM completion via {} ({} prompt bytes)", model, request.prompt.len());

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::MalformedResponse(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| LlmError::MalformedResponse("no choices in response".to_string()))
    }
}

/// Parse a model reply as JSON. Prose around a single object is tolerated by
/// falling back to the outermost `{...}` span.
pub fn extract_json(reply: &str) -> Result<Value, serde_json::Error> {
    match serde_json::from_str(reply.trim()) {
        Ok(value) => Ok(value),
        Err(err) => match (reply.find('{'), reply.rfind('}')) {
            (Some(start), Some(end)) if end > start => serde_json::from_str(&reply[start..=end]),
            _ => Err(err),
        },
    }
}
