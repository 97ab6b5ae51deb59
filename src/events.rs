use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Role in conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversationRole {
    System,
    User,
    Assistant,
}

impl ConversationRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversationRole::System => "system",
            ConversationRole::User => "user",
            ConversationRole::Assistant => "assistant",
        }
    }
}

impl fmt::Display for ConversationRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Roles that may be appended after the system directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnRole {
    User,
    Assistant,
}

impl From<TurnRole> for ConversationRole {
    fn from(role: TurnRole) -> Self {
        match role {
            TurnRole::User => ConversationRole::User,
            TurnRole::Assistant => ConversationRole::Assistant,
        }
    }
}

/// Individual conversation entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: ConversationRole,
    pub content: String,
    /// Display only; never sent to the model.
    #[serde(skip)]
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(role: ConversationRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Events delivered to the chat screen while a reply is in flight
#[derive(Debug, Clone)]
pub enum ReplyEvent {
    /// Text delta from the streaming response
    Delta(String),
    /// The call reached a terminal state
    Finished(crate::accumulator::Reply),
}
