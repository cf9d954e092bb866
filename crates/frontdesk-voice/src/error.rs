use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VoiceError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("{0} is not supported on this platform")]
    Unsupported(&'static str),

    #[error("cannot speak an empty utterance")]
    EmptyUtterance,

    #[error("a listen session is already active")]
    ListenInProgress,

    #[error("TTS error: {0}")]
    Tts(String),

    #[error("STT error: {0}")]
    Stt(String),
}

/// Why a synthesis session ended with an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SynthesisErrorKind {
    /// Playback was interrupted by a newer utterance.
    Interrupted,
    /// Playback was cancelled.
    Canceled,
    Other,
}

impl SynthesisErrorKind {
    /// Interruptions and cancellations happen on every cancel-then-speak and
    /// count as a normal end of speech.
    pub fn is_benign(self) -> bool {
        matches!(self, Self::Interrupted | Self::Canceled)
    }
}

impl fmt::Display for SynthesisErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Interrupted => write!(f, "interrupted"),
            Self::Canceled => write!(f, "canceled"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// Why a recognition session ended with an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecognitionErrorKind {
    /// Nothing intelligible was heard.
    NoSpeech,
    /// Microphone permission was denied.
    NotAllowed,
    Network,
    Other,
}

impl RecognitionErrorKind {
    /// Maps an engine error code (`"no-speech"`, `"not-allowed"`, ...) to a kind.
    pub fn from_code(code: &str) -> Self {
        match code.trim().to_ascii_lowercase().as_str() {
            "no-speech" => Self::NoSpeech,
            "not-allowed" | "service-not-allowed" => Self::NotAllowed,
            "network" => Self::Network,
            _ => Self::Other,
        }
    }

    /// Message shown to the visitor after a failed listen.
    pub fn prompt(self) -> &'static str {
        match self {
            Self::NoSpeech => "I didn't catch that. Please try again or type your message.",
            Self::NotAllowed => {
                "Microphone access was denied. Please allow it or use text input."
            }
            Self::Network | Self::Other => {
                "Voice input failed. Please try again or use text input."
            }
        }
    }
}

impl fmt::Display for RecognitionErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoSpeech => write!(f, "no-speech"),
            Self::NotAllowed => write!(f, "not-allowed"),
            Self::Network => write!(f, "network"),
            Self::Other => write!(f, "other"),
        }
    }
}
