use thiserror::Error;

/// Startup-time problems with the chat backend configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error(
        "chat backend credential is not configured; set dialogue.chat.api_key or FRONTDESK_OPENAI_API_KEY"
    )]
    MissingCredential,

    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),
}

/// A failed chat-completion call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("chat backend rejected the credential: {0}")]
    Unauthorized(String),

    #[error("chat backend returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("chat backend unreachable: {0}")]
    Transport(String),

    #[error("chat backend did not answer within {0} seconds")]
    Timeout(u64),

    #[error("malformed chat backend response: {0}")]
    MalformedResponse(String),

    #[error("chat backend returned an empty reply")]
    EmptyReply,
}

#[derive(Debug, Error)]
pub enum DialogueError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Backend(#[from] BackendError),
}
