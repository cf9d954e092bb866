use crate::backend::BackendFuture;
use crate::chat::{self, ChatDialogue};
use crate::error::{ConfigError, DialogueError};
use crate::scripted::{self, ScriptedReceptionist};
use crate::transcript::Transcript;
use frontdesk_types::ConversationState;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Which dialogue strategy a conversation runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    #[default]
    Scripted,
    Chat,
}

impl StrategyKind {
    pub fn as_str(self) -> &'static str {
        match self {
            StrategyKind::Scripted => "scripted",
            StrategyKind::Chat => "chat",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for StrategyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "scripted" => Ok(StrategyKind::Scripted),
            "chat" => Ok(StrategyKind::Chat),
            other => Err(format!("unknown dialogue mode: {}", other)),
        }
    }
}

/// A request to move the scripted dialogue back to `Greeting` later.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdleReturn {
    /// Identifies this request; a newer input invalidates it.
    pub epoch: u64,
    pub after: Duration,
}

/// The assistant's next line, plus any deferred follow-up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssistantReply {
    pub text: String,
    pub idle_return: Option<IdleReturn>,
}

impl AssistantReply {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            idle_return: None,
        }
    }
}

/// Result of asking a strategy for its next turn.
pub enum NextTurn {
    /// The reply is available now.
    Ready(AssistantReply),
    /// The reply arrives when the backend call completes.
    Pending(BackendFuture),
}

impl fmt::Debug for NextTurn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NextTurn::Ready(reply) => f.debug_tuple("Ready").field(reply).finish(),
            NextTurn::Pending(_) => f.write_str("Pending(..)"),
        }
    }
}

/// The dialogue policy of one conversation. Fixed for its lifetime.
#[derive(Debug)]
pub enum DialogueStrategy {
    Scripted(ScriptedReceptionist),
    Chat(ChatDialogue),
}

impl DialogueStrategy {
    pub fn scripted() -> Self {
        DialogueStrategy::Scripted(ScriptedReceptionist::new())
    }

    pub fn kind(&self) -> StrategyKind {
        match self {
            DialogueStrategy::Scripted(_) => StrategyKind::Scripted,
            DialogueStrategy::Chat(_) => StrategyKind::Chat,
        }
    }

    pub fn default_greeting(&self) -> &'static str {
        match self {
            DialogueStrategy::Scripted(_) => scripted::DEFAULT_GREETING,
            DialogueStrategy::Chat(_) => chat::DEFAULT_GREETING,
        }
    }

    /// A configuration problem detected when the strategy was built.
    pub fn config_error(&self) -> Option<&ConfigError> {
        match self {
            DialogueStrategy::Scripted(_) => None,
            DialogueStrategy::Chat(chat) => chat.config_error(),
        }
    }

    /// The scripted state, if this conversation is scripted.
    pub fn dialogue_state(&self) -> Option<ConversationState> {
        match self {
            DialogueStrategy::Scripted(fsm) => Some(fsm.state()),
            DialogueStrategy::Chat(_) => None,
        }
    }

    /// Produces the reply to `input`.
    ///
    /// `transcript` must already end with the visitor's turn for `input`.
    pub fn next_turn(
        &mut self,
        transcript: &Transcript,
        input: &str,
    ) -> Result<NextTurn, DialogueError> {
        match self {
            DialogueStrategy::Scripted(fsm) => Ok(NextTurn::Ready(fsm.respond(input))),
            DialogueStrategy::Chat(chat) => Ok(NextTurn::Pending(chat.next_turn(transcript)?)),
        }
    }

    /// Applies a scheduled idle return. Always `false` for chat.
    pub fn return_to_idle(&mut self, epoch: u64) -> bool {
        match self {
            DialogueStrategy::Scripted(fsm) => fsm.return_to_idle(epoch),
            DialogueStrategy::Chat(_) => false,
        }
    }
}
