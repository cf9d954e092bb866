//! Frontdesk server library logic.
//!
//! Hosts one receptionist conversation and exposes it to the collaborating
//! UI over HTTP and server-sent events.

pub mod api;
pub mod api_sse;
pub mod config;
pub mod orchestrator;
pub mod session;

use axum::{
    routing::{get, post},
    Extension, Json, Router,
};
use config::Config;
use frontdesk_dialogue::{ChatDialogue, DialogueStrategy, StrategyKind};
use frontdesk_voice::{ProcessSpeechEngine, SpeechAdapter};
use orchestrator::{Orchestrator, OrchestratorSettings};
use serde_json::{json, Value};
use session::SessionHandle;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// The running conversation.
    pub session: SessionHandle,
}

/// Builds the dialogue strategy selected by `dialogue.mode`.
pub fn build_strategy(config: &config::DialogueConfig) -> DialogueStrategy {
    match config.mode {
        StrategyKind::Scripted => DialogueStrategy::scripted(),
        StrategyKind::Chat => DialogueStrategy::Chat(ChatDialogue::from_config(&config.chat)),
    }
}

/// Wires the speech engine, the dialogue strategy and the orchestrator, and
/// starts the conversation task.
pub fn start_conversation(config: &Config) -> (SessionHandle, JoinHandle<()>) {
    let (inputs, receiver) = mpsc::unbounded_channel();
    let engine = ProcessSpeechEngine::new(config.speech.clone(), Arc::new(inputs.clone()));
    let adapter = SpeechAdapter::new(Box::new(engine), &config.speech);
    let settings = OrchestratorSettings {
        greeting: config.dialogue.greeting().map(str::to_string),
        backend_timeout: config.dialogue.backend_timeout(),
    };
    let orchestrator = Orchestrator::new(
        adapter,
        build_strategy(&config.dialogue),
        settings,
        inputs,
    );
    session::spawn(orchestrator, receiver)
}

/// Health check handler.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Builds the application router with all routes.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/conversation", get(api::get_conversation_handler))
        .route("/api/conversation/greet", post(api::greet_handler))
        .route("/api/conversation/messages", post(api::send_message_handler))
        .route("/api/voice/start", post(api::start_voice_handler))
        .route("/api/voice/stop", post(api::stop_voice_handler))
        .route("/api/speech/stop", post(api::stop_speaking_handler))
        .route(
            "/events/conversation",
            get(api_sse::get_conversation_stream_handler),
        )
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(Extension(Arc::new(state)))
}
