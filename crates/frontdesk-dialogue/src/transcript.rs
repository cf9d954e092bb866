use crate::backend::ChatMessage;
use frontdesk_types::Turn;

/// Append-only log of conversation turns.
///
/// There is no way to remove or edit a turn; indices are stable for the
/// lifetime of the transcript.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `turn` and returns its index.
    pub fn append(&mut self, turn: Turn) -> usize {
        self.turns.push(turn);
        self.turns.len() - 1
    }

    /// All turns in conversation order.
    pub fn all(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    /// The transcript as chat-completion role/content pairs.
    pub fn chat_messages(&self) -> Vec<ChatMessage> {
        self.turns
            .iter()
            .map(|turn| ChatMessage::new(turn.role.chat_role(), turn.text.clone()))
            .collect()
    }
}
