//! In-memory conversation history for one session.

use gardenchat_types::llm::Message;

/// Ordered user/assistant history, held only for the lifetime of a session.
///
/// Exchanges are appended as a pair so the history always alternates
/// user, assistant, user, assistant.
#[derive(Debug, Clone, Default)]
pub struct ConversationBuffer {
    messages: Vec<Message>,
}

impl ConversationBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one completed exchange (text only).
    pub fn record_exchange(&mut self, user_text: impl Into<String>, assistant_text: impl Into<String>) {
        self.messages.reserve(2);
        self.messages.push(Message::user(user_text));
        self.messages.push(Message::assistant(assistant_text));
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Number of recorded exchanges.
    pub fn turn_count(&self) -> usize {
        self.messages.len() / 2
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Drop all history. Used by the explicit reset command only.
    pub fn clear(&mut self) {
        self.messages.clear();
    }
}
