//! In-memory conversation history.

use uuid::Uuid;

use crate::core_types::{ChatMessage, Role, WireMessage};

/// Ordered, append-only message log for one conversation.
///
/// Identifiers come from a counter owned by the session and are never reused, including
/// after `clear`.
#[derive(Debug)]
pub struct Session {
    id: String,
    messages: Vec<ChatMessage>,
    next_id: u64,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            messages: Vec::new(),
            next_id: 1,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    pub fn append(&mut self, role: Role, content: &str) -> &ChatMessage {
        let message = ChatMessage::new(self.next_id, role, content.to_string());
        self.next_id += 1;
        self.messages.push(message);
        &self.messages[self.messages.len() - 1]
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Role/content pairs for the request, in creation order.
    pub fn wire_history(&self) -> Vec<WireMessage> {
        self.messages.iter().map(ChatMessage::to_wire).collect()
    }
}
