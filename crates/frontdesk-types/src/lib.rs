//! Shared types for the Frontdesk receptionist.
//!
//! This crate provides the foundational types used across the workspace:
//! transcript turns and speaker roles, the booking state of the scripted
//! receptionist, speech capability flags, and the read-only snapshot the
//! orchestrator publishes to the collaborating UI.
//!
//! No crate in the workspace depends on anything *except* `frontdesk-types`
//! for cross-cutting type definitions. This keeps the dependency graph clean
//! and prevents circular dependencies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod booking;
pub use booking::{AppointmentSlots, ConversationState};

/// Speaker of a transcript turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// The person talking to the receptionist.
    Visitor,
    /// The receptionist itself.
    Assistant,
}

impl Role {
    /// Returns the role name used by chat-completion APIs.
    pub fn chat_role(self) -> &'static str {
        match self {
            Self::Visitor => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// One utterance in the conversation.
///
/// Turns are immutable once created; the transcript only ever appends them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    /// Creates a visitor turn stamped with the current time.
    pub fn visitor(text: impl Into<String>) -> Self {
        Self {
            role: Role::Visitor,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }

    /// Creates an assistant turn stamped with the current time.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Speech capabilities of the platform, probed once at startup.
///
/// Either flag being `false` degrades the conversation to text for that
/// direction instead of failing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SpeechCapabilities {
    /// Speech synthesis (text-to-speech) is available.
    pub speech: bool,
    /// Speech recognition (speech-to-text) is available.
    pub recognition: bool,
}

impl SpeechCapabilities {
    /// Neither synthesis nor recognition; the conversation is text-only.
    pub const TEXT_ONLY: Self = Self {
        speech: false,
        recognition: false,
    };

    /// Both synthesis and recognition.
    pub const FULL: Self = Self {
        speech: true,
        recognition: true,
    };
}

/// Category of the most recent failure shown to the visitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The dialogue backend is not configured (missing credential).
    Config,
    /// A speech capability is missing on this platform.
    SpeechUnsupported,
    /// Speech recognition failed for the current listen session.
    Recognition,
    /// Speech synthesis failed for the current utterance.
    Synthesis,
    /// The dialogue backend call failed.
    Backend,
}

impl ErrorKind {
    /// Returns the string label for this kind.
    pub fn label(self) -> &'static str {
        match self {
            Self::Config => "config",
            Self::SpeechUnsupported => "speech_unsupported",
            Self::Recognition => "recognition",
            Self::Synthesis => "synthesis",
            Self::Backend => "backend",
        }
    }
}

/// The `last_error` projection: a kind plus a message suitable for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub kind: ErrorKind,
    pub message: String,
}

impl ErrorReport {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Read-only view of a conversation, published after every processed input.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ConversationSnapshot {
    /// The full transcript in conversation order.
    pub turns: Vec<Turn>,
    pub is_speaking: bool,
    pub is_listening: bool,
    /// A dialogue backend call is outstanding.
    pub is_processing: bool,
    pub last_error: Option<ErrorReport>,
    /// Current booking state; `None` when the dialogue is backend-delegated.
    pub dialogue_state: Option<ConversationState>,
    pub capabilities: SpeechCapabilities,
}
