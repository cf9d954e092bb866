//! API handlers for the Frontdesk server.

use crate::orchestrator::{Submission, VoiceInputError};
use crate::session::SessionError;
use crate::AppState;
use axum::{
    extract::{Extension, Json},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use frontdesk_types::ConversationSnapshot;
use frontdesk_voice::VoiceError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Request body for a typed visitor message.
#[derive(Debug, Deserialize)]
pub struct MessageRequest {
    pub text: String,
}

/// Response body for a submitted message.
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub status: Submission,
}

/// Response body for a greeting request.
#[derive(Debug, Serialize, Deserialize)]
pub struct GreetResponse {
    /// `false` when the visitor had already been greeted.
    pub greeted: bool,
}

/// API error type mapping to HTTP status codes.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("not supported: {0}")]
    Unsupported(String),
    #[error("unavailable: {0}")]
    Unavailable(String),
    #[error("internal server error: {0}")]
    InternalServerError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::Unsupported(msg) => (StatusCode::NOT_IMPLEMENTED, msg),
            ApiError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            ApiError::InternalServerError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(serde_json::json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

impl From<SessionError> for ApiError {
    fn from(error: SessionError) -> Self {
        let message = error.to_string();
        match error {
            SessionError::Closed => ApiError::Unavailable(message),
            SessionError::VoiceInput(VoiceInputError::Busy)
            | SessionError::VoiceInput(VoiceInputError::Voice(VoiceError::ListenInProgress)) => {
                ApiError::Conflict(message)
            }
            SessionError::VoiceInput(VoiceInputError::Voice(VoiceError::Unsupported(_))) => {
                ApiError::Unsupported(message)
            }
            SessionError::VoiceInput(_) => ApiError::InternalServerError(message),
        }
    }
}

/// Handler for `GET /api/conversation`.
pub async fn get_conversation_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> Json<ConversationSnapshot> {
    Json(state.session.snapshot())
}

/// Handler for `POST /api/conversation/greet`.
pub async fn greet_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<GreetResponse>, ApiError> {
    let greeted = state.session.greet().await?;
    Ok(Json(GreetResponse { greeted }))
}

/// Handler for `POST /api/conversation/messages`.
///
/// Answers `409 Conflict` with `status: "busy"` while a backend reply is
/// outstanding; the message is not recorded.
pub async fn send_message_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<MessageRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    let status = state.session.send_text(payload.text).await?;
    let code = match status {
        Submission::Busy => StatusCode::CONFLICT,
        Submission::Pending => StatusCode::ACCEPTED,
        Submission::Answered | Submission::Ignored => StatusCode::OK,
    };
    Ok((code, Json(MessageResponse { status })))
}

/// Handler for `POST /api/voice/start`.
pub async fn start_voice_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<StatusCode, ApiError> {
    state.session.start_voice().await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Handler for `POST /api/voice/stop`.
pub async fn stop_voice_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<StatusCode, ApiError> {
    state.session.stop_voice().await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Handler for `POST /api/speech/stop`.
pub async fn stop_speaking_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<StatusCode, ApiError> {
    state.session.stop_speaking().await?;
    Ok(StatusCode::NO_CONTENT)
}
