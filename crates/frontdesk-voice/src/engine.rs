//! The speech engine contract and the raw events engines report.

use crate::error::{RecognitionErrorKind, SynthesisErrorKind, VoiceError};
use frontdesk_types::SpeechCapabilities;
use std::fmt;
use tokio::sync::mpsc;

/// Generation id of one speak or listen operation.
///
/// Ids are allocated by the [`SpeechAdapter`](crate::SpeechAdapter) from a
/// single monotonic counter, so a larger id always belongs to a later
/// operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionId(u64);

impl SessionId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionKind {
    Speak,
    Listen,
}

/// One in-flight speak or listen operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpeechSession {
    pub id: SessionId,
    pub kind: SessionKind,
}

/// A callback from the engine, tagged with the session it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineEvent {
    pub session: SessionId,
    pub kind: EngineEventKind,
}

impl EngineEvent {
    pub fn new(session: SessionId, kind: EngineEventKind) -> Self {
        Self { session, kind }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEventKind {
    SpeakStarted,
    SpeakEnded,
    SpeakFailed {
        kind: SynthesisErrorKind,
        message: String,
    },
    ListenStarted,
    Recognized(String),
    ListenFailed {
        kind: RecognitionErrorKind,
        message: String,
    },
    ListenEnded,
}

/// Where an engine delivers its events.
///
/// Any unbounded channel whose item type can be built from an [`EngineEvent`]
/// is a sink, which lets the engine post straight into a conversation's input
/// queue.
pub trait EngineEventSink: Send + Sync {
    fn emit(&self, event: EngineEvent);
}

impl<T> EngineEventSink for mpsc::UnboundedSender<T>
where
    T: From<EngineEvent> + Send,
{
    fn emit(&self, event: EngineEvent) {
        // The receiver is gone only after the conversation shut down.
        let _ = self.send(T::from(event));
    }
}

/// Platform speech capability (dyn-compatible).
///
/// Implementations start work and return immediately; progress is reported
/// asynchronously through an [`EngineEventSink`] using the session id the
/// adapter passed in. Cancelling or stopping may still produce events for the
/// old session; the adapter discards them.
pub trait SpeechEngine: Send {
    /// What this engine can do. Called once, when the adapter is built.
    fn capabilities(&self) -> SpeechCapabilities;

    /// Begin speaking `text` as `session`.
    fn speak(&mut self, session: SessionId, text: &str) -> Result<(), VoiceError>;

    /// Silence the current utterance, if any.
    fn cancel_speak(&mut self);

    /// Begin a single-shot recognition attempt as `session`.
    fn listen(&mut self, session: SessionId) -> Result<(), VoiceError>;

    /// Terminate the current recognition attempt, if any.
    fn stop_listen(&mut self);

    /// Display name for this engine (e.g. "espeak-ng (en-us)").
    fn name(&self) -> String;
}
