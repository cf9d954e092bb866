//! Backend-delegated dialogue.

use crate::backend::{
    BackendFuture, ChatBackend, ChatRequest, OpenAiChatBackend, MAX_TOKENS, TEMPERATURE,
};
use crate::config::ChatConfig;
use crate::error::ConfigError;
use crate::transcript::Transcript;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Greeting spoken when the conversation opens.
pub const DEFAULT_GREETING: &str = "Hello! Welcome to our office. I'm your AI receptionist. May I know who you'd like to meet today?";

/// Persona and guidelines sent ahead of every conversation.
pub const SYSTEM_PROMPT: &str = "You are a professional and friendly AI receptionist for an office. Your primary job is to:

1. Greet visitors warmly
2. Ask who they would like to meet with
3. Collect necessary appointment details:
   - Name of the person they want to meet
   - Visitor's name
   - Purpose of the visit
   - Preferred date and time
4. Confirm the appointment details
5. Provide next steps or assistance

Guidelines:
- Be concise and conversational (responses will be spoken aloud)
- Keep responses to 2-3 sentences unless more detail is needed
- Be professional but friendly and welcoming
- Ask one question at a time to avoid overwhelming the visitor
- If the visitor seems unsure, offer to help or provide options
- Once you have all details, summarize the appointment and confirm

Remember: You're the first point of contact - make a great impression!";

/// Sends the full transcript to a [`ChatBackend`] on every turn.
///
/// A dialogue whose backend could not be configured still exists; every
/// turn then fails with the stored [`ConfigError`].
pub struct ChatDialogue {
    backend: Result<Arc<dyn ChatBackend>, ConfigError>,
    system_prompt: String,
}

impl fmt::Debug for ChatDialogue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let backend = match &self.backend {
            Ok(backend) => backend.name(),
            Err(e) => format!("unconfigured ({})", e),
        };
        f.debug_struct("ChatDialogue")
            .field("backend", &backend)
            .finish()
    }
}

impl ChatDialogue {
    pub fn new(backend: Arc<dyn ChatBackend>) -> Self {
        Self {
            backend: Ok(backend),
            system_prompt: SYSTEM_PROMPT.to_string(),
        }
    }

    pub fn unconfigured(error: ConfigError) -> Self {
        Self {
            backend: Err(error),
            system_prompt: SYSTEM_PROMPT.to_string(),
        }
    }

    /// Builds an OpenAI-backed dialogue, or an unconfigured one when the
    /// credential is missing. A configured `system_prompt` replaces the
    /// built-in instruction.
    pub fn from_config(config: &ChatConfig) -> Self {
        let dialogue = match OpenAiChatBackend::new(config) {
            Ok(backend) => {
                debug!(backend = %backend.name(), "chat backend configured");
                Self::new(Arc::new(backend))
            }
            Err(e) => {
                warn!(error = %e, "chat backend unavailable");
                Self::unconfigured(e)
            }
        };
        match config.system_prompt() {
            Some(prompt) => dialogue.with_system_prompt(prompt),
            None => dialogue,
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn config_error(&self) -> Option<&ConfigError> {
        self.backend.as_ref().err()
    }

    /// The completion request for the current transcript.
    pub fn request(&self, transcript: &Transcript) -> ChatRequest {
        ChatRequest {
            system: self.system_prompt.clone(),
            messages: transcript.chat_messages(),
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        }
    }

    /// Issues the backend call for the next assistant turn.
    pub fn next_turn(&self, transcript: &Transcript) -> Result<BackendFuture, ConfigError> {
        let backend = self.backend.as_ref().map_err(|e| e.clone())?;
        debug!(turns = transcript.len(), "requesting chat completion");
        Ok(backend.complete(self.request(transcript)))
    }
}
