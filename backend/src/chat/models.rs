//! Chat data models
//!
//! Defines structures for conversations and messages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Title given to a conversation before its first user message
pub const DEFAULT_TITLE: &str = "New Chat";

/// Title used when a conversation has messages but no usable user text
pub const FALLBACK_TITLE: &str = "Chat Conversation";

/// Titles longer than this many characters are shortened
const TITLE_MAX_CHARS: usize = 30;

/// Role of a message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Message from the user
    User,
    /// Message from the assistant/AI
    Assistant,
}

impl MessageRole {
    /// Convert the role to its string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }

    /// Parse the stored representation, `None` for anything unknown
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(MessageRole::User),
            "assistant" => Some(MessageRole::Assistant),
            _ => None,
        }
    }
}

/// A conversation thread
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Conversation {
    /// Unique identifier for the conversation
    pub id: String,
    /// Title of the conversation (derived from the first user message or user-set)
    pub title: String,
    /// When the conversation was created (Unix timestamp)
    pub created_at: i64,
    /// When the conversation was last updated (Unix timestamp)
    pub updated_at: i64,
}

impl Conversation {
    /// Create a new conversation with a fresh UUID and the default title
    pub fn new() -> Self {
        Self::with_title(DEFAULT_TITLE.to_string())
    }

    /// Create a new conversation with a fresh UUID and the given title
    pub fn with_title(title: String) -> Self {
        let now = Utc::now().timestamp();
        Self {
            id: Uuid::new_v4().to_string(),
            title,
            created_at: now,
            updated_at: now,
        }
    }

    /// Get created_at as DateTime
    pub fn created_at_datetime(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.created_at, 0).unwrap_or_else(Utc::now)
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

/// A single message in a conversation
///
/// Messages are immutable once appended to the Session Store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Unique identifier for the message
    pub id: String,
    /// ID of the conversation this message belongs to
    pub conversation_id: String,
    /// Role of the message sender
    pub role: MessageRole,
    /// Content of the message
    pub content: String,
    /// When the message was created (Unix timestamp)
    pub created_at: i64,
}

impl Message {
    /// Create a new message with a fresh UUID, timestamped now
    pub fn new(conversation_id: &str, role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            conversation_id: conversation_id.to_string(),
            role,
            content: content.into(),
            created_at: Utc::now().timestamp(),
        }
    }

    /// Shorthand for a user message
    pub fn user(conversation_id: &str, content: impl Into<String>) -> Self {
        Self::new(conversation_id, MessageRole::User, content)
    }

    /// Shorthand for an assistant message
    pub fn assistant(conversation_id: &str, content: impl Into<String>) -> Self {
        Self::new(conversation_id, MessageRole::Assistant, content)
    }

    /// Get created_at as DateTime
    pub fn created_at_datetime(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.created_at, 0).unwrap_or_else(Utc::now)
    }
}

/// Raw `messages` row as stored in SQLite
#[derive(Debug, FromRow)]
pub(crate) struct MessageRow {
    pub id: String,
    pub conversation_id: String,
    pub role: String, // Stored as "user" or "assistant" in DB
    pub content: String,
    pub created_at: i64,
}

impl TryFrom<MessageRow> for Message {
    type Error = String;

    fn try_from(row: MessageRow) -> Result<Self, Self::Error> {
        let role = MessageRole::parse(&row.role)
            .ok_or_else(|| format!("message {} has unknown role '{}'", row.id, row.role))?;
        Ok(Self {
            id: row.id,
            conversation_id: row.conversation_id,
            role,
            content: row.content,
            created_at: row.created_at,
        })
    }
}

/// Derive a human-readable conversation title from its messages
///
/// Uses the first user message. Messages longer than 30 characters are cut at
/// the last space inside the first 30 characters (or hard-cut at 27 when there
/// is none) and get a trailing `...`. Whitespace is then collapsed.
pub fn conversation_title(messages: &[Message]) -> String {
    if messages.is_empty() {
        return DEFAULT_TITLE.to_string();
    }

    let Some(first) = messages.iter().find(|m| m.role == MessageRole::User) else {
        return FALLBACK_TITLE.to_string();
    };

    let chars: Vec<char> = first.content.chars().collect();
    let name = if chars.len() > TITLE_MAX_CHARS {
        let head: String = chars[..TITLE_MAX_CHARS].iter().collect();
        match head.rfind(' ') {
            Some(cut) => format!("{}...", &head[..cut]),
            None => format!(
                "{}...",
                chars[..TITLE_MAX_CHARS - 3].iter().collect::<String>()
            ),
        }
    } else {
        first.content.clone()
    };

    let name = name.split_whitespace().collect::<Vec<_>>().join(" ");
    if name.is_empty() {
        FALLBACK_TITLE.to_string()
    } else {
        name
    }
}
