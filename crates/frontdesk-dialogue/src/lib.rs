//! Dialogue strategies for the Frontdesk receptionist.
//!
//! A [`DialogueStrategy`] decides the assistant's next turn. Two variants
//! exist, selected when the conversation is built:
//!
//! - [`ScriptedReceptionist`]: a deterministic slot-filling state machine
//!   that books a clinic appointment one question at a time. It runs
//!   synchronously and never touches the network.
//! - [`ChatDialogue`]: forwards the whole [`Transcript`] to a remote
//!   chat-completion [`ChatBackend`] and returns its reply.

pub mod backend;
pub mod chat;
pub mod config;
pub mod error;
pub mod scripted;
pub mod strategy;
pub mod transcript;

pub use backend::{BackendFuture, ChatBackend, ChatMessage, ChatRequest, OpenAiChatBackend};
pub use chat::ChatDialogue;
pub use config::ChatConfig;
pub use error::{BackendError, ConfigError, DialogueError};
pub use scripted::{classify_intent, Intent, ScriptedReceptionist};
pub use strategy::{AssistantReply, DialogueStrategy, IdleReturn, NextTurn, StrategyKind};
pub use transcript::Transcript;
