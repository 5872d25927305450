//! Session-owned conversation history.
//!
//! A [`Conversation`] always starts with the fixed system instruction and only
//! ever grows. It is owned by the session that created it and dropped with it;
//! nothing here is persisted.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Speaker of a conversation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Fixed instruction describing the assistant persona.
    System,
    /// The person using the assistant.
    User,
    /// The assistant.
    Assistant,
}

/// A single message in the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationMessage {
    /// Who produced the message.
    pub role: Role,
    /// Message text.
    pub content: String,
}

impl ConversationMessage {
    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Create an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Append-only message history for one session.
#[derive(Debug, Clone)]
pub struct Conversation {
    id: Uuid,
    messages: Vec<ConversationMessage>,
}

impl Conversation {
    /// Start a conversation with the given system instruction.
    pub fn new(system_instruction: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            messages: vec![ConversationMessage::system(system_instruction)],
        }
    }

    /// Identifier used to correlate log lines for this session.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The fixed system instruction.
    pub fn system_instruction(&self) -> &str {
        &self.messages[0].content
    }

    /// All messages, system instruction first.
    pub fn messages(&self) -> &[ConversationMessage] {
        &self.messages
    }

    /// Messages after the system instruction.
    pub fn turns(&self) -> &[ConversationMessage] {
        &self.messages[1..]
    }

    /// Whether the user has said anything yet.
    pub fn has_user_turns(&self) -> bool {
        self.turns().iter().any(|m| m.role == Role::User)
    }

    /// Total message count, including the system instruction.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Always false: the system instruction is present from construction.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Append one user turn and the assistant reply to it.
    pub fn record_exchange(&mut self, user: impl Into<String>, assistant: impl Into<String>) {
        self.messages.push(ConversationMessage::user(user));
        self.messages.push(ConversationMessage::assistant(assistant));
    }
}
