//! Speech infrastructure for the Frontdesk receptionist.
//!
//! Wraps a platform speech engine (synthesis and recognition) behind the
//! [`SpeechAdapter`], which gives every speak/listen operation an explicit
//! [`SpeechSession`] with a monotonic generation id. Engine callbacks are
//! tagged with that id so completions from a superseded or cancelled
//! operation can be discarded instead of corrupting the caller's view of
//! whether an utterance is playing.
//!
//! The engine itself is the [`SpeechEngine`] trait. [`ProcessSpeechEngine`]
//! implements it with a synthesizer subprocess (`espeak-ng` by default) and an
//! optional recognizer command.

pub mod adapter;
pub mod config;
pub mod engine;
pub mod error;
pub mod process;

pub use adapter::{SpeechAdapter, SpeechEvent};
pub use config::SpeechConfig;
pub use engine::{
    EngineEvent, EngineEventKind, EngineEventSink, SessionId, SessionKind, SpeechEngine,
    SpeechSession,
};
pub use error::{RecognitionErrorKind, SynthesisErrorKind, VoiceError};
pub use frontdesk_types::SpeechCapabilities;
pub use process::ProcessSpeechEngine;
