use frontdesk_dialogue::{
    BackendError, BackendFuture, ChatBackend, ChatDialogue, ChatRequest, ConfigError,
    DialogueStrategy,
};
use frontdesk_server::orchestrator::{
    Orchestrator, OrchestratorSettings, SessionInput, Submission, VoiceInputError, APOLOGY,
};
use frontdesk_types::{ConversationState, ErrorKind, Role, SpeechCapabilities};
use frontdesk_voice::{
    EngineEvent, EngineEventKind, EngineEventSink, RecognitionErrorKind, SessionId, SpeechAdapter,
    SpeechConfig, SpeechEngine, SynthesisErrorKind, VoiceError,
};
use std::ops::ControlFlow;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Speak(SessionId, String),
    CancelSpeak,
    Listen(SessionId),
    StopListen,
}

/// Records every call. With `auto_start`, reports each utterance as started
/// through the conversation queue, like a healthy engine would.
struct FakeEngine {
    calls: Arc<Mutex<Vec<Call>>>,
    capabilities: SpeechCapabilities,
    sink: mpsc::UnboundedSender<SessionInput>,
    auto_start: bool,
}

impl SpeechEngine for FakeEngine {
    fn capabilities(&self) -> SpeechCapabilities {
        self.capabilities
    }

    fn speak(&mut self, session: SessionId, text: &str) -> Result<(), VoiceError> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Speak(session, text.to_string()));
        if self.auto_start {
            self.sink
                .emit(EngineEvent::new(session, EngineEventKind::SpeakStarted));
        }
        Ok(())
    }

    fn cancel_speak(&mut self) {
        self.calls.lock().unwrap().push(Call::CancelSpeak);
    }

    fn listen(&mut self, session: SessionId) -> Result<(), VoiceError> {
        self.calls.lock().unwrap().push(Call::Listen(session));
        Ok(())
    }

    fn stop_listen(&mut self) {
        self.calls.lock().unwrap().push(Call::StopListen);
    }

    fn name(&self) -> String {
        "fake".to_string()
    }
}

struct Harness {
    orchestrator: Orchestrator,
    inputs: mpsc::UnboundedReceiver<SessionInput>,
    calls: Arc<Mutex<Vec<Call>>>,
}

impl Harness {
    fn build(
        strategy: DialogueStrategy,
        capabilities: SpeechCapabilities,
        auto_start: bool,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let calls = Arc::new(Mutex::new(Vec::new()));
        let engine = FakeEngine {
            calls: calls.clone(),
            capabilities,
            sink: tx.clone(),
            auto_start,
        };
        let adapter = SpeechAdapter::new(Box::new(engine), &SpeechConfig::default());
        let orchestrator =
            Orchestrator::new(adapter, strategy, OrchestratorSettings::default(), tx);
        Self {
            orchestrator,
            inputs: rx,
            calls,
        }
    }

    /// Scripted, voice-capable, with an engine that starts every utterance.
    fn voice() -> Self {
        Self::build(DialogueStrategy::scripted(), SpeechCapabilities::FULL, true)
    }

    /// Scripted with no speech at all.
    fn text_only() -> Self {
        Self::build(
            DialogueStrategy::scripted(),
            SpeechCapabilities::TEXT_ONLY,
            false,
        )
    }

    fn chat(backend: Arc<dyn ChatBackend>) -> Self {
        Self::build(
            DialogueStrategy::Chat(ChatDialogue::new(backend)),
            SpeechCapabilities::FULL,
            true,
        )
    }

    /// Lets `after` pass on the paused clock, then handles everything queued.
    async fn settle(&mut self, after: Duration) {
        tokio::time::sleep(after).await;
        while let Ok(input) = self.inputs.try_recv() {
            let _ = self.orchestrator.handle(input);
        }
        self.assert_exclusive();
    }

    fn engine(&mut self, session: SessionId, kind: EngineEventKind) {
        let _ = self
            .orchestrator
            .handle(SessionInput::Engine(EngineEvent::new(session, kind)));
        self.assert_exclusive();
    }

    fn say(&mut self, text: &str) -> Submission {
        let submission = self.orchestrator.send_user_text(text);
        self.assert_exclusive();
        submission
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn spoken(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Speak(_, text) => Some(text),
                _ => None,
            })
            .collect()
    }

    fn turns(&self) -> Vec<(Role, String)> {
        self.orchestrator
            .transcript()
            .all()
            .iter()
            .map(|turn| (turn.role, turn.text.clone()))
            .collect()
    }

    fn last_text(&self) -> String {
        self.orchestrator
            .transcript()
            .last()
            .map(|turn| turn.text.clone())
            .unwrap_or_default()
    }

    fn state(&self) -> Option<ConversationState> {
        self.orchestrator.dialogue_state()
    }

    fn assert_exclusive(&self) {
        assert!(
            !(self.orchestrator.is_speaking() && self.orchestrator.is_listening()),
            "speaking and listening at the same time"
        );
    }
}

const TICK: Duration = Duration::from_millis(10);

#[tokio::test(start_paused = true)]
async fn greets_once_and_speaks_greeting() {
    let mut h = Harness::voice();

    assert!(h.orchestrator.greet());
    assert!(!h.orchestrator.greet());
    h.settle(TICK).await;

    let turns = h.turns();
    assert_eq!(turns.len(), 1);
    assert_eq!(turns[0].0, Role::Assistant);
    assert!(turns[0].1.contains("HealthCare Clinic"));
    assert_eq!(h.spoken(), vec![turns[0].1.clone()]);
    assert!(h.orchestrator.is_speaking());
}

#[tokio::test(start_paused = true)]
async fn configured_greeting_replaces_default() {
    let (tx, _rx) = mpsc::unbounded_channel();
    let engine = FakeEngine {
        calls: Arc::default(),
        capabilities: SpeechCapabilities::TEXT_ONLY,
        sink: tx.clone(),
        auto_start: false,
    };
    let adapter = SpeechAdapter::new(Box::new(engine), &SpeechConfig::default());
    let settings = OrchestratorSettings {
        greeting: Some("Welcome to the lobby!".to_string()),
        ..Default::default()
    };
    let mut orchestrator = Orchestrator::new(adapter, DialogueStrategy::scripted(), settings, tx);

    orchestrator.greet();
    assert_eq!(
        orchestrator.transcript().last().unwrap().text,
        "Welcome to the lobby!"
    );
}

#[tokio::test(start_paused = true)]
async fn scripted_booking_walkthrough() {
    let mut h = Harness::text_only();
    h.orchestrator.greet();

    for input in [
        "I want to book an appointment",
        "Jane Doe",
        "555-1212",
        "jane@x.com",
        "Dr. Smith",
        "2026-01-15",
        "10 AM",
    ] {
        assert_eq!(h.say(input), Submission::Answered);
    }

    assert_eq!(h.state(), Some(ConversationState::Completed));
    let confirmation = h.last_text();
    for expected in ["Dr. Smith", "2026-01-15", "10 AM", "jane@x.com"] {
        assert!(confirmation.contains(expected), "missing {expected}");
    }

    // Greeting plus seven visitor/assistant pairs, alternating after the greeting.
    let turns = h.turns();
    assert_eq!(turns.len(), 15);
    for (i, (role, _)) in turns.iter().enumerate().skip(1) {
        let expected = if i % 2 == 1 {
            Role::Visitor
        } else {
            Role::Assistant
        };
        assert_eq!(*role, expected);
    }

    // Text-only: nothing was spoken and no flag was ever raised.
    assert!(h.calls().is_empty());
    assert!(!h.orchestrator.is_speaking());
    assert!(h.orchestrator.last_error().is_none());
}

#[tokio::test(start_paused = true)]
async fn closing_returns_to_greeting_after_delay() {
    let mut h = Harness::text_only();
    for input in [
        "book",
        "Jane Doe",
        "555-1212",
        "jane@x.com",
        "Dr. Smith",
        "2026-01-15",
        "10 AM",
    ] {
        h.say(input);
    }

    h.say("no, that's all");
    assert!(h.last_text().contains("Have a wonderful day"));

    h.settle(Duration::from_secs(2)).await;
    assert_eq!(h.state(), Some(ConversationState::Completed));

    h.settle(Duration::from_millis(1500)).await;
    assert_eq!(h.state(), Some(ConversationState::Greeting));

    // Slots were cleared: a new booking starts from the name again.
    h.say("schedule please");
    assert_eq!(h.state(), Some(ConversationState::AskingName));
}

#[tokio::test(start_paused = true)]
async fn newer_input_cancels_pending_idle_return() {
    let mut h = Harness::text_only();
    for input in [
        "book",
        "Jane Doe",
        "555-1212",
        "jane@x.com",
        "Dr. Smith",
        "2026-01-15",
        "10 AM",
        "no",
    ] {
        h.say(input);
    }

    h.say("yes");
    assert_eq!(h.state(), Some(ConversationState::Greeting));
    h.say("I'd like to book an appointment");
    assert_eq!(h.state(), Some(ConversationState::AskingName));

    h.settle(Duration::from_secs(4)).await;
    assert_eq!(h.state(), Some(ConversationState::AskingName));
}

#[tokio::test(start_paused = true)]
async fn visitor_input_is_recorded_as_received() {
    let mut h = Harness::text_only();
    h.say("book");
    assert_eq!(h.say("  Jane Doe "), Submission::Answered);

    assert_eq!(h.turns()[2], (Role::Visitor, "  Jane Doe ".to_string()));
    assert!(h.last_text().contains("Thank you,   Jane Doe ."));
}

#[tokio::test(start_paused = true)]
async fn blank_input_is_ignored() {
    let mut h = Harness::text_only();
    assert_eq!(h.say("   \n\t"), Submission::Ignored);
    assert_eq!(h.say(""), Submission::Ignored);
    assert!(h.orchestrator.transcript().is_empty());
}

#[tokio::test(start_paused = true)]
async fn barge_in_cancels_speech_then_reply_ends_listening() {
    let mut h = Harness::voice();
    h.orchestrator.greet();
    h.settle(TICK).await;
    assert!(h.orchestrator.is_speaking());

    h.orchestrator.start_voice_input().unwrap();
    h.settle(TICK).await;
    assert!(!h.orchestrator.is_speaking());
    assert!(h.orchestrator.is_listening());
    let listen = h.orchestrator.active_listen().unwrap().id;
    assert!(h.calls().contains(&Call::CancelSpeak));

    h.engine(listen, EngineEventKind::ListenStarted);
    h.engine(listen, EngineEventKind::Recognized("What are your hours?".to_string()));

    let turns = h.turns();
    assert_eq!(turns[1], (Role::Visitor, "What are your hours?".to_string()));
    assert!(turns[2].1.contains("Monday to Friday"));
    assert!(!h.orchestrator.is_listening());
    assert!(h.orchestrator.is_speaking());
    assert!(h.calls().contains(&Call::StopListen));

    // The engine's own end event arrives late and is ignored.
    h.engine(listen, EngineEventKind::ListenEnded);
    assert!(h.orchestrator.is_speaking());
    assert!(!h.orchestrator.is_listening());
}

#[tokio::test(start_paused = true)]
async fn superseded_speech_events_are_ignored() {
    let mut h = Harness::voice();
    h.orchestrator.greet();
    h.settle(TICK).await;
    let first = h.orchestrator.active_speak().unwrap().id;

    h.say("where are you located");
    h.settle(TICK).await;
    let second = h.orchestrator.active_speak().unwrap().id;
    assert!(second > first);

    // The first utterance reports its end after being replaced.
    h.engine(first, EngineEventKind::SpeakEnded);
    assert!(h.orchestrator.is_speaking());

    h.engine(second, EngineEventKind::SpeakEnded);
    assert!(!h.orchestrator.is_speaking());
}

#[tokio::test(start_paused = true)]
async fn benign_interruption_ends_speech_without_error() {
    let mut h = Harness::voice();
    h.orchestrator.greet();
    h.settle(TICK).await;
    let session = h.orchestrator.active_speak().unwrap().id;

    h.engine(
        session,
        EngineEventKind::SpeakFailed {
            kind: SynthesisErrorKind::Interrupted,
            message: "interrupted".to_string(),
        },
    );
    assert!(!h.orchestrator.is_speaking());
    assert!(h.orchestrator.last_error().is_none());
}

#[tokio::test(start_paused = true)]
async fn speech_that_never_starts_is_retried_then_reported() {
    let mut h = Harness::build(DialogueStrategy::scripted(), SpeechCapabilities::FULL, false);
    h.orchestrator.greet();

    h.settle(Duration::from_millis(150)).await;
    assert_eq!(h.spoken().len(), 2, "utterance should be re-issued once");
    assert!(h.orchestrator.is_speaking());
    assert!(h.orchestrator.last_error().is_none());

    h.settle(Duration::from_millis(150)).await;
    assert_eq!(h.spoken().len(), 2);
    assert!(!h.orchestrator.is_speaking());
    assert_eq!(
        h.orchestrator.last_error().map(|e| e.kind),
        Some(ErrorKind::Synthesis)
    );
    // The transcript is not touched by the retry.
    assert_eq!(h.turns().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn fatal_speech_error_after_start_is_reported() {
    let mut h = Harness::voice();
    h.orchestrator.greet();
    h.settle(TICK).await;
    let session = h.orchestrator.active_speak().unwrap().id;

    h.engine(
        session,
        EngineEventKind::SpeakFailed {
            kind: SynthesisErrorKind::Other,
            message: "audio device lost".to_string(),
        },
    );
    assert!(!h.orchestrator.is_speaking());
    let error = h.orchestrator.last_error().unwrap();
    assert_eq!(error.kind, ErrorKind::Synthesis);
    assert!(error.message.contains("audio device lost"));
}

#[tokio::test(start_paused = true)]
async fn recognition_error_reprompts_and_clears_listening() {
    let mut h = Harness::voice();
    h.orchestrator.start_voice_input().unwrap();
    let listen = h.orchestrator.active_listen().unwrap().id;

    h.engine(
        listen,
        EngineEventKind::ListenFailed {
            kind: RecognitionErrorKind::NoSpeech,
            message: "no-speech".to_string(),
        },
    );
    let error = h.orchestrator.last_error().unwrap().clone();
    assert_eq!(error.kind, ErrorKind::Recognition);
    assert_eq!(error.message, RecognitionErrorKind::NoSpeech.prompt());

    h.engine(listen, EngineEventKind::ListenEnded);
    assert!(!h.orchestrator.is_listening());
    assert!(h.orchestrator.transcript().is_empty());

    // Listening again clears the re-prompt.
    h.orchestrator.start_voice_input().unwrap();
    assert!(h.orchestrator.last_error().is_none());
}

#[tokio::test(start_paused = true)]
async fn recognition_error_without_engine_end_allows_listening_again() {
    let mut h = Harness::voice();
    h.orchestrator.start_voice_input().unwrap();
    let first = h.orchestrator.active_listen().unwrap().id;

    h.engine(
        first,
        EngineEventKind::ListenFailed {
            kind: RecognitionErrorKind::NotAllowed,
            message: "not-allowed".to_string(),
        },
    );
    assert!(!h.orchestrator.is_listening());
    assert_eq!(
        h.orchestrator.last_error().map(|e| e.message.clone()),
        Some(RecognitionErrorKind::NotAllowed.prompt().to_string())
    );

    h.orchestrator.start_voice_input().unwrap();
    let second = h.orchestrator.active_listen().unwrap().id;
    assert!(second > first);
}

#[tokio::test(start_paused = true)]
async fn reentrant_listen_is_rejected() {
    let mut h = Harness::voice();
    h.orchestrator.start_voice_input().unwrap();
    let err = h.orchestrator.start_voice_input().unwrap_err();
    assert!(matches!(
        err,
        VoiceInputError::Voice(VoiceError::ListenInProgress)
    ));
    assert!(h.orchestrator.is_listening());
}

#[tokio::test(start_paused = true)]
async fn stop_and_cancel_are_idempotent() {
    let mut h = Harness::voice();
    h.orchestrator.stop_voice_input();
    h.orchestrator.stop_speaking();
    assert!(h.calls().is_empty());

    h.orchestrator.start_voice_input().unwrap();
    h.orchestrator.stop_voice_input();
    h.orchestrator.stop_voice_input();
    assert!(!h.orchestrator.is_listening());

    h.orchestrator.greet();
    h.orchestrator.stop_speaking();
    h.orchestrator.stop_speaking();
    assert!(!h.orchestrator.is_speaking());

    let stops = h.calls().iter().filter(|c| **c == Call::StopListen).count();
    let cancels = h.calls().iter().filter(|c| **c == Call::CancelSpeak).count();
    assert_eq!(stops, 1);
    assert_eq!(cancels, 1);
}

#[tokio::test(start_paused = true)]
async fn missing_recognition_is_reported_only_on_request() {
    let mut h = Harness::text_only();
    assert!(h.orchestrator.last_error().is_none());

    let err = h.orchestrator.start_voice_input().unwrap_err();
    assert!(matches!(err, VoiceInputError::Voice(VoiceError::Unsupported(_))));
    assert_eq!(
        h.orchestrator.last_error().map(|e| e.kind),
        Some(ErrorKind::SpeechUnsupported)
    );
    assert!(!h.orchestrator.is_listening());
}

#[tokio::test(start_paused = true)]
async fn shutdown_stops_everything() {
    let mut h = Harness::voice();
    h.orchestrator.greet();
    assert_eq!(
        h.orchestrator.handle(SessionInput::Shutdown),
        ControlFlow::Break(())
    );
    assert!(!h.orchestrator.is_speaking());
}

#[tokio::test(start_paused = true)]
async fn snapshots_follow_the_conversation() {
    let mut h = Harness::text_only();
    let mut snapshots = h.orchestrator.subscribe();
    assert!(snapshots.borrow_and_update().turns.is_empty());

    let (reply, response) = oneshot::channel();
    let _ = h.orchestrator.handle(SessionInput::Command(
        frontdesk_server::orchestrator::Command::Greet { reply },
    ));
    assert!(response.await.unwrap());

    assert!(snapshots.has_changed().unwrap());
    let snapshot = snapshots.borrow_and_update().clone();
    assert_eq!(snapshot.turns.len(), 1);
    assert_eq!(snapshot.dialogue_state, Some(ConversationState::Greeting));
    assert_eq!(snapshot.capabilities, SpeechCapabilities::TEXT_ONLY);
}

// Chat strategy

/// Answers each call once the test releases it.
#[derive(Default)]
struct GatedBackend {
    gates: Mutex<Vec<oneshot::Sender<Result<String, BackendError>>>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl GatedBackend {
    fn release(&self, result: Result<String, BackendError>) {
        let gate = self.gates.lock().unwrap().remove(0);
        let _ = gate.send(result);
    }
}

impl ChatBackend for GatedBackend {
    fn complete(&self, request: ChatRequest) -> BackendFuture {
        let (tx, rx) = oneshot::channel();
        self.gates.lock().unwrap().push(tx);
        self.requests.lock().unwrap().push(request);
        Box::pin(async move {
            rx.await
                .unwrap_or_else(|_| Err(BackendError::Transport("gate dropped".to_string())))
        })
    }

    fn name(&self) -> String {
        "gated".to_string()
    }
}

struct SilentBackend;

impl ChatBackend for SilentBackend {
    fn complete(&self, _request: ChatRequest) -> BackendFuture {
        Box::pin(std::future::pending())
    }

    fn name(&self) -> String {
        "silent".to_string()
    }
}

#[tokio::test(start_paused = true)]
async fn chat_reply_arrives_through_the_queue() {
    let backend = Arc::new(GatedBackend::default());
    let mut h = Harness::chat(backend.clone());
    h.orchestrator.greet();
    assert!(h.last_text().contains("AI receptionist"));
    assert_eq!(h.state(), None);

    assert_eq!(h.say("Hi, I'm here to see Dr. Smith"), Submission::Pending);
    assert!(h.orchestrator.is_processing());

    backend.release(Ok("Of course. May I have your name?".to_string()));
    h.settle(TICK).await;

    assert!(!h.orchestrator.is_processing());
    assert_eq!(h.last_text(), "Of course. May I have your name?");
    assert!(h.spoken().contains(&"Of course. May I have your name?".to_string()));

    // The backend saw the greeting and the visitor turn.
    let requests = backend.requests.lock().unwrap();
    assert_eq!(requests[0].messages.len(), 2);
    assert_eq!(requests[0].messages[0].role, "assistant");
    assert_eq!(requests[0].messages[1].role, "user");
}

#[tokio::test(start_paused = true)]
async fn chat_rejects_input_while_processing() {
    let backend = Arc::new(GatedBackend::default());
    let mut h = Harness::chat(backend.clone());

    assert_eq!(h.say("hello"), Submission::Pending);
    assert_eq!(h.say("hello again"), Submission::Busy);
    assert_eq!(h.turns().len(), 1);
    assert!(matches!(
        h.orchestrator.start_voice_input(),
        Err(VoiceInputError::Busy)
    ));

    backend.release(Ok("Welcome!".to_string()));
    h.settle(TICK).await;
    assert_eq!(h.say("thanks"), Submission::Pending);
    assert_eq!(h.turns().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn chat_failure_speaks_apology() {
    let backend = Arc::new(GatedBackend::default());
    let mut h = Harness::chat(backend.clone());

    h.say("hello");
    backend.release(Err(BackendError::Unauthorized(
        "Incorrect API key provided".to_string(),
    )));
    h.settle(TICK).await;

    assert_eq!(
        h.turns(),
        vec![
            (Role::Visitor, "hello".to_string()),
            (Role::Assistant, APOLOGY.to_string()),
        ]
    );
    assert_eq!(h.spoken().last().map(String::as_str), Some(APOLOGY));
    let error = h.orchestrator.last_error().unwrap();
    assert_eq!(error.kind, ErrorKind::Backend);
    assert!(error.message.contains("Incorrect API key provided"));
    assert!(!h.orchestrator.is_processing());
}

#[tokio::test(start_paused = true)]
async fn chat_timeout_speaks_apology() {
    let mut h = Harness::chat(Arc::new(SilentBackend));

    assert_eq!(h.say("hello"), Submission::Pending);
    h.settle(Duration::from_secs(29)).await;
    assert!(h.orchestrator.is_processing());

    h.settle(Duration::from_secs(2)).await;
    assert!(!h.orchestrator.is_processing());
    assert_eq!(h.last_text(), APOLOGY);
    assert!(h
        .orchestrator
        .last_error()
        .unwrap()
        .message
        .contains("30 seconds"));
}

#[tokio::test(start_paused = true)]
async fn unconfigured_chat_reports_once_and_apologizes() {
    let mut h = Harness::build(
        DialogueStrategy::Chat(ChatDialogue::unconfigured(ConfigError::MissingCredential)),
        SpeechCapabilities::TEXT_ONLY,
        false,
    );
    assert_eq!(
        h.orchestrator.last_error().map(|e| e.kind),
        Some(ErrorKind::Config)
    );

    assert_eq!(h.say("hello"), Submission::Answered);
    assert_eq!(h.say("anyone there?"), Submission::Answered);

    let turns = h.turns();
    assert_eq!(turns.len(), 4);
    assert_eq!(turns[1], (Role::Assistant, APOLOGY.to_string()));
    assert_eq!(turns[3], (Role::Assistant, APOLOGY.to_string()));
    assert_eq!(
        h.orchestrator.last_error().map(|e| e.kind),
        Some(ErrorKind::Config)
    );
}
