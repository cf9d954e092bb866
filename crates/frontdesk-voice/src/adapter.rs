//! Session bookkeeping on top of a [`SpeechEngine`].
//!
//! The adapter is the only place that allocates session ids and the only
//! place engine events are interpreted. It guarantees, for its caller:
//!
//! - at most one utterance is active; `speak` cancels the previous one
//! - events for a superseded or cancelled session are never surfaced
//! - benign synthesis errors (`interrupted`, `canceled`) surface as a normal
//!   end of speech
//! - every listen session surfaces at most one terminal result (recognized
//!   text or an error), followed by exactly one `ListenEnd`; a terminal
//!   result closes the session without waiting for the engine's own end
//!
//! The adapter never sleeps. The grace interval for the speak-retry
//! workaround is scheduled by the caller, which reports expiry through
//! [`SpeechAdapter::on_start_grace_elapsed`].

use crate::config::SpeechConfig;
use crate::engine::{EngineEvent, EngineEventKind, SessionId, SessionKind, SpeechEngine, SpeechSession};
use crate::error::{RecognitionErrorKind, SynthesisErrorKind, VoiceError};
use frontdesk_types::SpeechCapabilities;
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// A normalized event for the currently active session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechEvent {
    SpeakStart(SpeechSession),
    SpeakEnd(SpeechSession),
    /// The utterance never started and was re-issued under a new session.
    SpeakRetried {
        previous: SpeechSession,
        session: SpeechSession,
    },
    SpeakError {
        session: SpeechSession,
        kind: SynthesisErrorKind,
        message: String,
    },
    ListenStart(SpeechSession),
    Recognized {
        session: SpeechSession,
        text: String,
    },
    ListenError {
        session: SpeechSession,
        kind: RecognitionErrorKind,
        message: String,
    },
    ListenEnd(SpeechSession),
}

#[derive(Debug)]
struct ActiveSpeak {
    session: SpeechSession,
    text: String,
    started: bool,
    retried: bool,
}

/// Wraps a speech engine with explicit sessions and generation ids.
pub struct SpeechAdapter {
    engine: Box<dyn SpeechEngine>,
    capabilities: SpeechCapabilities,
    start_grace: Duration,
    last_id: u64,
    speaking: Option<ActiveSpeak>,
    listening: Option<SpeechSession>,
}

impl SpeechAdapter {
    /// Wraps `engine`, probing its capabilities once.
    pub fn new(engine: Box<dyn SpeechEngine>, config: &SpeechConfig) -> Self {
        let capabilities = engine.capabilities();
        info!(
            engine = %engine.name(),
            speech = capabilities.speech,
            recognition = capabilities.recognition,
            "speech adapter ready"
        );
        Self {
            engine,
            capabilities,
            start_grace: config.start_grace(),
            last_id: 0,
            speaking: None,
            listening: None,
        }
    }

    pub fn capabilities(&self) -> SpeechCapabilities {
        self.capabilities
    }

    /// How long to wait for `SpeakStart` before calling
    /// [`on_start_grace_elapsed`](Self::on_start_grace_elapsed).
    pub fn start_grace(&self) -> Duration {
        self.start_grace
    }

    pub fn engine_name(&self) -> String {
        self.engine.name()
    }

    /// The speak session whose events are currently accepted.
    pub fn active_speak(&self) -> Option<SpeechSession> {
        self.speaking.as_ref().map(|s| s.session)
    }

    /// The listen session whose events are currently accepted.
    pub fn active_listen(&self) -> Option<SpeechSession> {
        self.listening
    }

    fn next_session(&mut self, kind: SessionKind) -> SpeechSession {
        self.last_id += 1;
        SpeechSession {
            id: SessionId::new(self.last_id),
            kind,
        }
    }

    /// Speaks `text`, cancelling whatever is currently being spoken.
    pub fn speak(&mut self, text: &str) -> Result<SpeechSession, VoiceError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(VoiceError::EmptyUtterance);
        }
        if !self.capabilities.speech {
            return Err(VoiceError::Unsupported("speech synthesis"));
        }

        self.cancel_speak();

        let session = self.next_session(SessionKind::Speak);
        self.engine.speak(session.id, text)?;
        debug!(session = %session.id, "speaking");
        self.speaking = Some(ActiveSpeak {
            session,
            text: text.to_string(),
            started: false,
            retried: false,
        });
        Ok(session)
    }

    /// Silences the active utterance. Returns the cancelled session, or
    /// `None` when nothing was being spoken. No event is surfaced for the
    /// cancelled session afterwards.
    pub fn cancel_speak(&mut self) -> Option<SpeechSession> {
        let active = self.speaking.take()?;
        self.engine.cancel_speak();
        debug!(session = %active.session.id, "speech cancelled");
        Some(active.session)
    }

    /// Starts a single-shot recognition attempt.
    pub fn listen(&mut self) -> Result<SpeechSession, VoiceError> {
        if !self.capabilities.recognition {
            return Err(VoiceError::Unsupported("speech recognition"));
        }
        if self.listening.is_some() {
            return Err(VoiceError::ListenInProgress);
        }

        let session = self.next_session(SessionKind::Listen);
        self.engine.listen(session.id)?;
        debug!(session = %session.id, "listening");
        self.listening = Some(session);
        Ok(session)
    }

    /// Stops the active recognition attempt and returns its `ListenEnd`.
    ///
    /// The end event is produced here rather than waiting for the engine, so
    /// it is guaranteed even if the engine never reports one. Returns `None`
    /// when nothing was listening.
    pub fn stop_listen(&mut self) -> Option<SpeechEvent> {
        let session = self.listening.take()?;
        self.engine.stop_listen();
        debug!(session = %session.id, "listening stopped");
        Some(SpeechEvent::ListenEnd(session))
    }

    /// Interprets a raw engine event. Stale or duplicate events yield
    /// nothing. A terminal listen result yields the result followed by the
    /// session's `ListenEnd`.
    pub fn on_engine_event(&mut self, event: EngineEvent) -> Vec<SpeechEvent> {
        if self.active_speak().map(|s| s.id) == Some(event.session) {
            return self.on_speak_event(event.kind).into_iter().collect();
        }
        if self.active_listen().map(|l| l.id) == Some(event.session) {
            return self.on_listen_event(event.kind);
        }
        trace!(session = %event.session, kind = ?event.kind, "dropping stale engine event");
        Vec::new()
    }

    fn on_speak_event(&mut self, kind: EngineEventKind) -> Option<SpeechEvent> {
        let active = self.speaking.as_mut()?;
        let session = active.session;
        match kind {
            EngineEventKind::SpeakStarted => {
                if active.started {
                    return None;
                }
                active.started = true;
                Some(SpeechEvent::SpeakStart(session))
            }
            EngineEventKind::SpeakEnded => {
                self.speaking = None;
                Some(SpeechEvent::SpeakEnd(session))
            }
            EngineEventKind::SpeakFailed { kind, .. } if kind.is_benign() => {
                debug!(session = %session.id, %kind, "speech ended early");
                self.speaking = None;
                Some(SpeechEvent::SpeakEnd(session))
            }
            EngineEventKind::SpeakFailed { kind, message } => {
                if !active.started && !active.retried {
                    warn!(session = %session.id, error = %message, "speech failed to start, retrying");
                    return self.retry_speak();
                }
                self.speaking = None;
                Some(SpeechEvent::SpeakError {
                    session,
                    kind,
                    message,
                })
            }
            other => {
                debug!(session = %session.id, kind = ?other, "ignoring listen event for speak session");
                None
            }
        }
    }

    fn on_listen_event(&mut self, kind: EngineEventKind) -> Vec<SpeechEvent> {
        let Some(session) = self.listening else {
            return Vec::new();
        };
        let terminal = match kind {
            EngineEventKind::ListenStarted => return vec![SpeechEvent::ListenStart(session)],
            EngineEventKind::ListenEnded => {
                self.listening = None;
                return vec![SpeechEvent::ListenEnd(session)];
            }
            EngineEventKind::Recognized(text) => {
                let text = text.trim().to_string();
                if text.is_empty() {
                    SpeechEvent::ListenError {
                        session,
                        kind: RecognitionErrorKind::NoSpeech,
                        message: "recognized an empty utterance".to_string(),
                    }
                } else {
                    SpeechEvent::Recognized { session, text }
                }
            }
            EngineEventKind::ListenFailed { kind, message } => SpeechEvent::ListenError {
                session,
                kind,
                message,
            },
            other => {
                debug!(session = %session.id, kind = ?other, "ignoring speak event for listen session");
                return Vec::new();
            }
        };

        // The session is over once it has a result; later engine events for
        // it are stale.
        self.listening = None;
        self.engine.stop_listen();
        debug!(session = %session.id, "listen session closed");
        vec![terminal, SpeechEvent::ListenEnd(session)]
    }

    /// Called when the grace interval for `session` has passed.
    ///
    /// If the utterance has not started, it is re-issued once under a new
    /// session (`SpeakRetried`); a second miss is reported as a fatal
    /// `SpeakError`. Returns `None` when `session` started or is stale.
    pub fn on_start_grace_elapsed(&mut self, session: SessionId) -> Option<SpeechEvent> {
        let active = self.speaking.as_ref()?;
        if active.session.id != session || active.started {
            return None;
        }
        if !active.retried {
            warn!(session = %session, "speech did not start within grace interval, retrying");
            return self.retry_speak();
        }

        let active = self.speaking.take()?;
        self.engine.cancel_speak();
        warn!(session = %session, "speech did not start after retry");
        Some(SpeechEvent::SpeakError {
            session: active.session,
            kind: SynthesisErrorKind::Other,
            message: "speech engine did not start the utterance".to_string(),
        })
    }

    fn retry_speak(&mut self) -> Option<SpeechEvent> {
        let previous = self.speaking.take()?;
        self.engine.cancel_speak();

        let session = self.next_session(SessionKind::Speak);
        match self.engine.speak(session.id, &previous.text) {
            Ok(()) => {
                self.speaking = Some(ActiveSpeak {
                    session,
                    text: previous.text,
                    started: false,
                    retried: true,
                });
                Some(SpeechEvent::SpeakRetried {
                    previous: previous.session,
                    session,
                })
            }
            Err(e) => Some(SpeechEvent::SpeakError {
                session: previous.session,
                kind: SynthesisErrorKind::Other,
                message: e.to_string(),
            }),
        }
    }
}

impl std::fmt::Debug for SpeechAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpeechAdapter")
            .field("engine", &self.engine.name())
            .field("capabilities", &self.capabilities)
            .field("speaking", &self.speaking)
            .field("listening", &self.listening)
            .finish()
    }
}
