// Session pointer
// Per-UI-session reference to the currently selected conversation

use serde::{Deserialize, Serialize};

/// Unique identifier for a conversation
pub type ConversationId = String;

/// Reference to the conversation a UI session is looking at
///
/// Not persisted. Only the "new conversation" and "select conversation"
/// actions move it; every other adapter call just reads it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionPointer {
    /// ID of the currently selected conversation, if any
    pub conversation_id: Option<ConversationId>,
}

impl SessionPointer {
    /// Pointer with nothing selected
    pub fn new() -> Self {
        Self::default()
    }

    /// Pointer already aimed at `conversation_id`
    ///
    /// Used by stateless front ends that carry the id client-side.
    pub fn at(conversation_id: impl Into<ConversationId>) -> Self {
        Self {
            conversation_id: Some(conversation_id.into()),
        }
    }

    /// Select a conversation
    pub fn select(&mut self, conversation_id: impl Into<ConversationId>) {
        self.conversation_id = Some(conversation_id.into());
    }

    /// Deselect the current conversation
    pub fn clear(&mut self) {
        self.conversation_id = None;
    }

    /// Currently selected conversation, if any
    pub fn current(&self) -> Option<&str> {
        self.conversation_id.as_deref()
    }
}
