//! Chat message structures and delivery status

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who wrote a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Lekha
    User,
    /// The terminal
    Model,
}

impl Role {
    /// Label shown above the message
    pub fn label(&self) -> &'static str {
        match self {
            Role::User => "ЛЕХА",
            Role::Model => "ТЕРМИНАЛ",
        }
    }
}

/// Delivery status of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    /// Request in flight
    Sending,
    /// Answered
    Sent,
    /// Fell back
    Failed,
}

impl MessageStatus {
    /// Status tag shown under user messages
    pub fn label(&self) -> &'static str {
        match self {
            MessageStatus::Sending => "ОТПРАВКА",
            MessageStatus::Sent => "ДОСТАВЛЕНО",
            MessageStatus::Failed => "СБОЙ",
        }
    }
}

/// Fresh message id
pub fn make_id() -> String {
    Uuid::new_v4().to_string()
}

/// One line of the conversation log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Id used only to find the message again
    pub id: String,
    /// Author
    pub role: Role,
    /// Content
    pub text: String,
    /// Creation time (Unix milliseconds)
    #[serde(rename = "ts")]
    pub timestamp: i64,
    /// Delivery status, if tracked
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<MessageStatus>,
}

impl Message {
    /// Create a message stamped now
    pub fn new(role: Role, text: impl Into<String>, status: Option<MessageStatus>) -> Self {
        Self {
            id: make_id(),
            role,
            text: text.into(),
            timestamp: Utc::now().timestamp_millis(),
            status,
        }
    }

    /// User message that is being sent
    pub fn outgoing(text: impl Into<String>) -> Self {
        Self::new(Role::User, text, Some(MessageStatus::Sending))
    }

    /// Terminal message
    pub fn reply(text: impl Into<String>, status: MessageStatus) -> Self {
        Self::new(Role::Model, text, Some(status))
    }

    /// Local `HH:MM` of the timestamp
    pub fn time_label(&self) -> String {
        DateTime::from_timestamp_millis(self.timestamp)
            .map(|dt| dt.with_timezone(&Local).format("%H:%M").to_string())
            .unwrap_or_else(|| "--:--".to_string())
    }
}
