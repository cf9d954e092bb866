//! The per-conversation task and the handle the HTTP layer talks to.

use crate::orchestrator::{Command, Orchestrator, SessionInput, Submission, VoiceInputError};
use frontdesk_types::ConversationSnapshot;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{info, Instrument};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("the conversation has ended")]
    Closed,

    #[error(transparent)]
    VoiceInput(#[from] VoiceInputError),
}

/// Cheap, cloneable access to a running conversation.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    id: Uuid,
    inputs: mpsc::UnboundedSender<SessionInput>,
    snapshots: watch::Receiver<ConversationSnapshot>,
}

/// Runs `orchestrator` on its own task, draining `receiver` in order.
pub fn spawn(
    orchestrator: Orchestrator,
    receiver: mpsc::UnboundedReceiver<SessionInput>,
) -> (SessionHandle, JoinHandle<()>) {
    let id = Uuid::new_v4();
    let handle = SessionHandle {
        id,
        inputs: orchestrator.input_sender(),
        snapshots: orchestrator.subscribe(),
    };

    let task = tokio::spawn(
        run(orchestrator, receiver)
            .instrument(tracing::info_span!("conversation", id = %id)),
    );
    (handle, task)
}

async fn run(
    mut orchestrator: Orchestrator,
    mut receiver: mpsc::UnboundedReceiver<SessionInput>,
) {
    info!("conversation started");
    while let Some(input) = receiver.recv().await {
        if orchestrator.handle(input).is_break() {
            break;
        }
    }
    info!("conversation ended");
}

impl SessionHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The most recently published snapshot.
    pub fn snapshot(&self) -> ConversationSnapshot {
        self.snapshots.borrow().clone()
    }

    /// A receiver that is notified whenever the snapshot changes.
    pub fn subscribe(&self) -> watch::Receiver<ConversationSnapshot> {
        self.snapshots.clone()
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, SessionError> {
        let (reply, response) = oneshot::channel();
        self.inputs
            .send(SessionInput::Command(build(reply)))
            .map_err(|_| SessionError::Closed)?;
        response.await.map_err(|_| SessionError::Closed)
    }

    /// Returns `false` when the visitor was already greeted.
    pub async fn greet(&self) -> Result<bool, SessionError> {
        self.request(|reply| Command::Greet { reply }).await
    }

    pub async fn send_text(&self, text: impl Into<String>) -> Result<Submission, SessionError> {
        let text = text.into();
        self.request(|reply| Command::SendText { text, reply }).await
    }

    pub async fn start_voice(&self) -> Result<(), SessionError> {
        self.request(|reply| Command::StartVoice { reply })
            .await?
            .map_err(SessionError::from)
    }

    pub async fn stop_voice(&self) -> Result<(), SessionError> {
        self.request(|reply| Command::StopVoice { reply }).await
    }

    pub async fn stop_speaking(&self) -> Result<(), SessionError> {
        self.request(|reply| Command::StopSpeaking { reply }).await
    }

    /// Asks the conversation to stop. Pending speech and listening end.
    pub fn shutdown(&self) {
        let _ = self.inputs.send(SessionInput::Shutdown);
    }
}
