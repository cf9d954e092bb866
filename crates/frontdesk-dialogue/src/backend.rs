//! Chat-completion backends.
//!
//! [`ChatBackend`] is the seam the [`ChatDialogue`](crate::ChatDialogue)
//! talks to. [`OpenAiChatBackend`] implements it against the OpenAI-compatible
//! `/v1/chat/completions` endpoint.

use crate::config::ChatConfig;
use crate::error::{BackendError, ConfigError};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tracing::debug;

/// Sampling temperature for every receptionist reply.
pub const TEMPERATURE: f32 = 0.7;

/// Response-length cap for every receptionist reply.
pub const MAX_TOKENS: u32 = 500;

/// One role/content pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }
}

/// Everything a backend needs for one completion.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub system: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// An outstanding completion call. It cannot be aborted once issued.
pub type BackendFuture = Pin<Box<dyn Future<Output = Result<String, BackendError>> + Send>>;

/// Remote dialogue generation (dyn-compatible).
pub trait ChatBackend: Send + Sync {
    /// Starts a completion for `request`; the future resolves to the reply.
    fn complete(&self, request: ChatRequest) -> BackendFuture;

    /// Display name for this backend (e.g. "openai (gpt-4o-mini)").
    fn name(&self) -> String;
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: Option<String>,
}

/// Client for the OpenAI Chat Completions API.
#[derive(Clone)]
pub struct OpenAiChatBackend {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    timeout_secs: u64,
}

impl std::fmt::Debug for OpenAiChatBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiChatBackend")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .finish()
    }
}

impl OpenAiChatBackend {
    /// Builds the client. A missing credential is a configuration error.
    pub fn new(config: &ChatConfig) -> Result<Self, ConfigError> {
        let api_key = config
            .credential()
            .ok_or(ConfigError::MissingCredential)?
            .to_string();

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: format!(
                "{}/v1/chat/completions",
                config.base_url.trim_end_matches('/')
            ),
            api_key,
            model: config.model.clone(),
            timeout_secs: config.request_timeout_secs,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// The JSON body: the system instruction followed by the conversation.
    pub fn request_body(&self, request: &ChatRequest) -> serde_json::Value {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        messages.push(ChatMessage::new("system", request.system.clone()));
        messages.extend(request.messages.iter().cloned());

        serde_json::json!({
            "model": self.model,
            "messages": messages,
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
        })
    }
}

impl ChatBackend for OpenAiChatBackend {
    fn complete(&self, request: ChatRequest) -> BackendFuture {
        let body = self.request_body(&request);
        let call = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body);
        let timeout_secs = self.timeout_secs;

        Box::pin(async move {
            let response = call.send().await.map_err(|e| {
                if e.is_timeout() {
                    BackendError::Timeout(timeout_secs)
                } else {
                    BackendError::Transport(e.to_string())
                }
            })?;

            let status = response.status();
            let bytes = response
                .bytes()
                .await
                .map_err(|e| BackendError::Transport(e.to_string()))?;

            if !status.is_success() {
                let message = serde_json::from_slice::<ErrorBody>(&bytes)
                    .ok()
                    .and_then(|body| body.error)
                    .and_then(|detail| detail.message)
                    .unwrap_or_else(|| "chat completion request failed".to_string());
                debug!(status = status.as_u16(), %message, "chat completion failed");
                if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                    return Err(BackendError::Unauthorized(message));
                }
                return Err(BackendError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            let parsed: CompletionResponse = serde_json::from_slice(&bytes)
                .map_err(|e| BackendError::MalformedResponse(e.to_string()))?;

            parsed
                .choices
                .into_iter()
                .next()
                .and_then(|choice| choice.message.content)
                .map(|content| content.trim().to_string())
                .filter(|content| !content.is_empty())
                .ok_or(BackendError::EmptyReply)
        })
    }

    fn name(&self) -> String {
        format!("openai ({})", self.model)
    }
}
