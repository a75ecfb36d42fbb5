//! Offline echo responder
//!
//! Answers by repeating the latest user message. Used when no Gemini API key
//! is configured so the front ends stay usable without network access.

use crate::chat::models::{Message, MessageRole};
use crate::responder::{ChunkStream, Responder, ResponderError};
use async_trait::async_trait;

/// Responder that echoes the latest user message back
#[derive(Debug, Default, Clone)]
pub struct EchoResponder;

impl EchoResponder {
    /// Create a new echo responder
    pub fn new() -> Self {
        Self
    }

    fn reply_for(history: &[Message]) -> Result<String, ResponderError> {
        let last_user = history
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::User)
            .ok_or(ResponderError::EmptyConversation)?;
        Ok(format!("You said: {}", last_user.content))
    }
}

#[async_trait]
impl Responder for EchoResponder {
    fn name(&self) -> &str {
        "echo"
    }

    async fn respond(&self, history: &[Message]) -> Result<String, ResponderError> {
        Self::reply_for(history)
    }

    async fn respond_stream(&self, history: &[Message]) -> Result<ChunkStream, ResponderError> {
        let reply = Self::reply_for(history)?;
        // One chunk per word, keeping the separating spaces
        let chunks: Vec<Result<String, ResponderError>> = reply
            .split_inclusive(' ')
            .map(|word| Ok(word.to_string()))
            .collect();
        Ok(Box::pin(futures_util::stream::iter(chunks)))
    }
}
