//! Bounded conversation history

use crate::storage::message::{Message, MessageStatus};

/// Number of messages kept
pub const HISTORY_LIMIT: usize = 100;

/// Ordered conversation log capped to the most recent [`HISTORY_LIMIT`] entries
#[derive(Debug, Clone, Default, PartialEq)]
pub struct History {
    messages: Vec<Message>,
}

impl History {
    /// Empty history
    pub fn new() -> Self {
        Self::default()
    }

    /// History from stored messages; only the newest entries survive
    pub fn from_messages(mut messages: Vec<Message>) -> Self {
        if messages.len() > HISTORY_LIMIT {
            messages.drain(..messages.len() - HISTORY_LIMIT);
        }
        Self { messages }
    }

    /// Append a message, dropping the oldest once over the cap
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
        if self.messages.len() > HISTORY_LIMIT {
            let excess = self.messages.len() - HISTORY_LIMIT;
            self.messages.drain(..excess);
        }
    }

    /// Set the status of the message with `id`; false if it is gone
    pub fn patch_status(&mut self, id: &str, status: MessageStatus) -> bool {
        match self.messages.iter_mut().find(|m| m.id == id) {
            Some(message) => {
                message.status = Some(status);
                true
            }
            None => false,
        }
    }

    /// Find a message by id
    pub fn get(&self, id: &str) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    /// Drop everything
    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Messages in display order
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Most recent message
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Number of messages
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the log is empty
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
