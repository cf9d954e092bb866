//! The conversation orchestrator.
//!
//! One [`Orchestrator`] owns everything about a conversation: the transcript,
//! the dialogue strategy and the speech adapter. It never blocks and never
//! awaits. Work that takes time (speech start grace, the scripted idle
//! return, backend calls) runs in spawned tasks that post a
//! [`SessionInput`] back into the conversation's queue, and the session loop
//! feeds those inputs to [`Orchestrator::handle`] one at a time.
//!
//! Listening and speaking are mutually exclusive: speaking a reply ends any
//! listen session first, and starting to listen silences any reply.

use frontdesk_dialogue::{
    AssistantReply, BackendError, BackendFuture, DialogueError, DialogueStrategy, IdleReturn,
    NextTurn, Transcript,
};
use frontdesk_types::{
    ConversationSnapshot, ConversationState, ErrorKind, ErrorReport, SpeechCapabilities, Turn,
};
use frontdesk_voice::{EngineEvent, SessionId, SpeechAdapter, SpeechEvent, SpeechSession, VoiceError};
use serde::{Deserialize, Serialize};
use std::ops::ControlFlow;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, error, info, warn};

/// Spoken in place of a reply when the dialogue backend fails.
pub const APOLOGY: &str = "Sorry, I encountered an error. Please try again.";

const RECOGNITION_UNSUPPORTED: &str =
    "Voice input is not available here. Please type your message instead.";

/// What happened to a submitted visitor message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Submission {
    /// The assistant reply was appended immediately.
    Answered,
    /// A backend call was issued; the reply follows later.
    Pending,
    /// Blank input; nothing was recorded.
    Ignored,
    /// A backend call is still outstanding; nothing was recorded.
    Busy,
}

#[derive(Debug, Error)]
pub enum VoiceInputError {
    #[error("a reply is still being generated")]
    Busy,

    #[error(transparent)]
    Voice(#[from] VoiceError),
}

/// A request from the UI, answered through its `reply` channel.
#[derive(Debug)]
pub enum Command {
    Greet {
        reply: oneshot::Sender<bool>,
    },
    SendText {
        text: String,
        reply: oneshot::Sender<Submission>,
    },
    StartVoice {
        reply: oneshot::Sender<Result<(), VoiceInputError>>,
    },
    StopVoice {
        reply: oneshot::Sender<()>,
    },
    StopSpeaking {
        reply: oneshot::Sender<()>,
    },
}

/// Everything a conversation reacts to, in arrival order.
#[derive(Debug)]
pub enum SessionInput {
    Command(Command),
    Engine(EngineEvent),
    SpeakGraceElapsed(SessionId),
    IdleReturn {
        epoch: u64,
    },
    BackendReply {
        request: u64,
        result: Result<String, BackendError>,
    },
    Shutdown,
}

impl From<EngineEvent> for SessionInput {
    fn from(event: EngineEvent) -> Self {
        SessionInput::Engine(event)
    }
}

impl From<Command> for SessionInput {
    fn from(command: Command) -> Self {
        SessionInput::Command(command)
    }
}

#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    /// Replaces the strategy's default greeting.
    pub greeting: Option<String>,
    /// Upper bound on one backend call.
    pub backend_timeout: Duration,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            greeting: None,
            backend_timeout: Duration::from_secs(30),
        }
    }
}

/// Sequences one conversation between the visitor, the dialogue strategy
/// and the speech engine.
#[derive(Debug)]
pub struct Orchestrator {
    adapter: SpeechAdapter,
    strategy: DialogueStrategy,
    transcript: Transcript,
    inputs: mpsc::UnboundedSender<SessionInput>,
    settings: OrchestratorSettings,
    greeted: bool,
    last_request: u64,
    pending_request: Option<u64>,
    last_error: Option<ErrorReport>,
    snapshots: watch::Sender<ConversationSnapshot>,
}

impl Orchestrator {
    /// Builds an orchestrator whose timers and backend calls post into
    /// `inputs`. A strategy configuration problem is reported once here.
    pub fn new(
        adapter: SpeechAdapter,
        strategy: DialogueStrategy,
        settings: OrchestratorSettings,
        inputs: mpsc::UnboundedSender<SessionInput>,
    ) -> Self {
        let last_error = strategy.config_error().map(|e| {
            error!(error = %e, "dialogue backend is not configured; replies will be apologies");
            ErrorReport::new(ErrorKind::Config, e.to_string())
        });

        info!(
            strategy = %strategy.kind(),
            engine = %adapter.engine_name(),
            "conversation ready"
        );

        let (snapshots, _) = watch::channel(ConversationSnapshot::default());
        let orchestrator = Self {
            adapter,
            strategy,
            transcript: Transcript::new(),
            inputs,
            settings,
            greeted: false,
            last_request: 0,
            pending_request: None,
            last_error,
            snapshots,
        };
        orchestrator.publish();
        orchestrator
    }

    /// A sender into this conversation's input queue.
    pub fn input_sender(&self) -> mpsc::UnboundedSender<SessionInput> {
        self.inputs.clone()
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// True from the moment an utterance is handed to the engine, before it
    /// reports `SpeakStart`, until it ends, fails or is cancelled. An
    /// utterance that never starts stays speaking through both grace
    /// intervals.
    pub fn is_speaking(&self) -> bool {
        self.adapter.active_speak().is_some()
    }

    pub fn is_listening(&self) -> bool {
        self.adapter.active_listen().is_some()
    }

    /// A backend call is outstanding.
    pub fn is_processing(&self) -> bool {
        self.pending_request.is_some()
    }

    pub fn last_error(&self) -> Option<&ErrorReport> {
        self.last_error.as_ref()
    }

    pub fn dialogue_state(&self) -> Option<ConversationState> {
        self.strategy.dialogue_state()
    }

    pub fn capabilities(&self) -> SpeechCapabilities {
        self.adapter.capabilities()
    }

    pub fn active_speak(&self) -> Option<SpeechSession> {
        self.adapter.active_speak()
    }

    pub fn active_listen(&self) -> Option<SpeechSession> {
        self.adapter.active_listen()
    }

    /// A receiver notified whenever the observable state changes.
    pub fn subscribe(&self) -> watch::Receiver<ConversationSnapshot> {
        self.snapshots.subscribe()
    }

    fn publish(&self) {
        let snapshot = self.snapshot();
        self.snapshots.send_if_modified(|current| {
            if *current == snapshot {
                return false;
            }
            *current = snapshot;
            true
        });
    }

    pub fn snapshot(&self) -> ConversationSnapshot {
        ConversationSnapshot {
            turns: self.transcript.all().to_vec(),
            is_speaking: self.is_speaking(),
            is_listening: self.is_listening(),
            is_processing: self.is_processing(),
            last_error: self.last_error.clone(),
            dialogue_state: self.dialogue_state(),
            capabilities: self.capabilities(),
        }
    }

    /// Processes one queued input and publishes the resulting snapshot.
    /// Breaks on [`SessionInput::Shutdown`].
    pub fn handle(&mut self, input: SessionInput) -> ControlFlow<()> {
        let mut flow = ControlFlow::Continue(());
        match input {
            SessionInput::Command(command) => {
                // Replies go out after the snapshot so callers observe the
                // state their command produced.
                self.dispatch(command);
                return flow;
            }
            SessionInput::Engine(event) => {
                for event in self.adapter.on_engine_event(event) {
                    self.on_speech_event(event);
                }
            }
            SessionInput::SpeakGraceElapsed(session) => {
                if let Some(event) = self.adapter.on_start_grace_elapsed(session) {
                    self.on_speech_event(event);
                }
            }
            SessionInput::IdleReturn { epoch } => {
                if self.strategy.return_to_idle(epoch) {
                    info!("booking finished, ready for the next visitor");
                }
            }
            SessionInput::BackendReply { request, result } => {
                self.on_backend_reply(request, result);
            }
            SessionInput::Shutdown => {
                self.stop_voice_input();
                self.stop_speaking();
                info!(turns = self.transcript.len(), "conversation shutting down");
                flow = ControlFlow::Break(());
            }
        }
        self.publish();
        flow
    }

    fn dispatch(&mut self, command: Command) {
        // A dropped reply receiver means the caller gave up waiting.
        match command {
            Command::Greet { reply } => {
                let greeted = self.greet();
                self.publish();
                let _ = reply.send(greeted);
            }
            Command::SendText { text, reply } => {
                let submission = self.send_user_text(&text);
                self.publish();
                let _ = reply.send(submission);
            }
            Command::StartVoice { reply } => {
                let result = self.start_voice_input();
                self.publish();
                let _ = reply.send(result);
            }
            Command::StopVoice { reply } => {
                self.stop_voice_input();
                self.publish();
                let _ = reply.send(());
            }
            Command::StopSpeaking { reply } => {
                self.stop_speaking();
                self.publish();
                let _ = reply.send(());
            }
        }
    }

    /// Appends and speaks the greeting. Only the first call has an effect.
    pub fn greet(&mut self) -> bool {
        if self.greeted {
            debug!("greeting already delivered");
            return false;
        }
        self.greeted = true;

        let text = self
            .settings
            .greeting
            .clone()
            .unwrap_or_else(|| self.strategy.default_greeting().to_string());
        info!("greeting visitor");
        self.reply(AssistantReply::new(text));
        true
    }

    /// Records a visitor turn and produces the assistant's reply. Non-blank
    /// input is recorded and handed to the strategy exactly as received.
    pub fn send_user_text(&mut self, text: &str) -> Submission {
        if text.trim().is_empty() {
            debug!("ignoring blank visitor input");
            return Submission::Ignored;
        }
        if let Some(request) = self.pending_request {
            debug!(request, "backend call outstanding, rejecting visitor input");
            return Submission::Busy;
        }

        self.stop_voice_input();
        self.transcript.append(Turn::visitor(text));

        match self.strategy.next_turn(&self.transcript, text) {
            Ok(NextTurn::Ready(reply)) => {
                self.reply(reply);
                Submission::Answered
            }
            Ok(NextTurn::Pending(call)) => {
                self.await_backend(call);
                Submission::Pending
            }
            Err(e) => {
                self.fail_turn(e);
                Submission::Answered
            }
        }
    }

    /// Starts listening, silencing any reply in progress.
    pub fn start_voice_input(&mut self) -> Result<(), VoiceInputError> {
        if self.pending_request.is_some() {
            debug!("backend call outstanding, not listening");
            return Err(VoiceInputError::Busy);
        }
        if !self.adapter.capabilities().recognition {
            self.report(ErrorKind::SpeechUnsupported, RECOGNITION_UNSUPPORTED);
            return Err(VoiceError::Unsupported("speech recognition").into());
        }

        self.stop_speaking();

        match self.adapter.listen() {
            Ok(session) => {
                if matches!(
                    self.last_error,
                    Some(ErrorReport {
                        kind: ErrorKind::Recognition,
                        ..
                    })
                ) {
                    self.last_error = None;
                }
                info!(session = %session.id, "listening for visitor");
                Ok(())
            }
            Err(VoiceError::ListenInProgress) => {
                debug!("already listening");
                Err(VoiceError::ListenInProgress.into())
            }
            Err(e) => {
                warn!(error = %e, "failed to start listening");
                self.report(ErrorKind::Recognition, e.to_string());
                Err(e.into())
            }
        }
    }

    /// Ends the current listen session, if any.
    pub fn stop_voice_input(&mut self) {
        if let Some(event) = self.adapter.stop_listen() {
            self.on_speech_event(event);
        }
    }

    /// Silences the current reply, if any.
    pub fn stop_speaking(&mut self) {
        if let Some(session) = self.adapter.cancel_speak() {
            debug!(session = %session.id, "reply silenced");
        }
    }

    /// Replaces `last_error`.
    fn report(&mut self, kind: ErrorKind, message: impl Into<String>) {
        let report = ErrorReport::new(kind, message);
        debug!(kind = kind.label(), message = %report.message, "reporting error to visitor");
        self.last_error = Some(report);
    }

    fn reply(&mut self, reply: AssistantReply) {
        self.transcript.append(Turn::assistant(reply.text.clone()));
        if let Some(idle) = reply.idle_return {
            self.schedule_idle_return(idle);
        }
        self.speak(&reply.text);
    }

    fn speak(&mut self, text: &str) {
        self.stop_voice_input();
        match self.adapter.speak(text) {
            Ok(session) => self.schedule_start_grace(session.id),
            Err(VoiceError::Unsupported(_)) => debug!("speech output unavailable, reply is text only"),
            Err(VoiceError::EmptyUtterance) => debug!("nothing to speak"),
            Err(e) => {
                warn!(error = %e, "failed to speak reply");
                self.report(ErrorKind::Synthesis, e.to_string());
            }
        }
    }

    fn fail_turn(&mut self, error: DialogueError) {
        match &error {
            DialogueError::Config(e) => warn!(error = %e, "cannot reach dialogue backend"),
            DialogueError::Backend(e) => {
                warn!(error = %e, "dialogue backend call failed");
                self.report(ErrorKind::Backend, e.to_string());
            }
        }
        self.reply(AssistantReply::new(APOLOGY));
    }

    fn await_backend(&mut self, call: BackendFuture) {
        self.last_request += 1;
        let request = self.last_request;
        self.pending_request = Some(request);

        let timeout = self.settings.backend_timeout;
        let inputs = self.inputs.clone();
        tokio::spawn(async move {
            let result = match tokio::time::timeout(timeout, call).await {
                Ok(result) => result,
                Err(_) => Err(BackendError::Timeout(timeout.as_secs())),
            };
            let _ = inputs.send(SessionInput::BackendReply { request, result });
        });
        debug!(request, "awaiting backend reply");
    }

    fn on_backend_reply(&mut self, request: u64, result: Result<String, BackendError>) {
        if self.pending_request != Some(request) {
            debug!(request, "ignoring reply for a request that is no longer pending");
            return;
        }
        self.pending_request = None;
        match result {
            Ok(text) => self.reply(AssistantReply::new(text)),
            Err(e) => self.fail_turn(e.into()),
        }
    }

    fn schedule_start_grace(&self, session: SessionId) {
        let grace = self.adapter.start_grace();
        let inputs = self.inputs.clone();
        tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            let _ = inputs.send(SessionInput::SpeakGraceElapsed(session));
        });
    }

    fn schedule_idle_return(&self, idle: IdleReturn) {
        let inputs = self.inputs.clone();
        tokio::spawn(async move {
            tokio::time::sleep(idle.after).await;
            let _ = inputs.send(SessionInput::IdleReturn { epoch: idle.epoch });
        });
        debug!(epoch = idle.epoch, after_ms = idle.after.as_millis() as u64, "idle return scheduled");
    }

    fn on_speech_event(&mut self, event: SpeechEvent) {
        match event {
            SpeechEvent::SpeakStart(session) => debug!(session = %session.id, "speech started"),
            SpeechEvent::SpeakEnd(session) => debug!(session = %session.id, "speech finished"),
            SpeechEvent::SpeakRetried { previous, session } => {
                info!(previous = %previous.id, session = %session.id, "speech re-issued");
                self.schedule_start_grace(session.id);
            }
            SpeechEvent::SpeakError {
                session,
                kind,
                message,
            } => {
                warn!(session = %session.id, %kind, error = %message, "speech failed");
                self.report(
                    ErrorKind::Synthesis,
                    format!("Speech output failed: {}", message),
                );
            }
            SpeechEvent::ListenStart(session) => debug!(session = %session.id, "listen started"),
            SpeechEvent::Recognized { session, text } => {
                info!(session = %session.id, chars = text.len(), "recognized visitor speech");
                if self.send_user_text(&text) == Submission::Busy {
                    warn!(session = %session.id, "recognized speech dropped, reply still pending");
                }
            }
            SpeechEvent::ListenError {
                session,
                kind,
                message,
            } => {
                warn!(session = %session.id, %kind, error = %message, "recognition failed");
                self.report(ErrorKind::Recognition, kind.prompt());
            }
            SpeechEvent::ListenEnd(session) => debug!(session = %session.id, "listen ended"),
        }
    }
}
