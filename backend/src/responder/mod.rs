//! Responder module
//!
//! The external collaborator that turns a conversation history into the
//! assistant's reply. The Conversation Graph only sees the `Responder` trait;
//! implementations decide how (and whether) to retry.

pub mod echo;
pub mod error;
pub mod gemini;
pub mod gemini_types;

pub use echo::EchoResponder;
pub use error::ResponderError;
pub use gemini::GeminiResponder;

use crate::chat::models::Message;
use crate::config::{ResponderConfig, ResponderKind};
use async_trait::async_trait;
use futures_util::stream::Stream;
use std::pin::Pin;
use std::sync::Arc;

/// Lazy, finite sequence of partial reply chunks
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<String, ResponderError>> + Send>>;

/// Produces assistant replies from a conversation history
///
/// `history` is the full ordered conversation, ending with the user message
/// that should be answered.
#[async_trait]
pub trait Responder: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Produce the complete reply
    async fn respond(&self, history: &[Message]) -> Result<String, ResponderError>;

    /// Produce the reply as a stream of chunks
    ///
    /// The default implementation delivers the whole reply as one chunk.
    async fn respond_stream(&self, history: &[Message]) -> Result<ChunkStream, ResponderError> {
        let reply = self.respond(history).await?;
        Ok(Box::pin(futures_util::stream::once(async move { Ok(reply) })))
    }
}

/// Build the responder selected by configuration
pub fn build_responder(config: &ResponderConfig) -> Arc<dyn Responder> {
    match config.kind {
        ResponderKind::Gemini => Arc::new(GeminiResponder::from_config(config)),
        ResponderKind::Echo => Arc::new(EchoResponder::new()),
    }
}
