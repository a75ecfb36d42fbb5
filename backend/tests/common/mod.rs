//! Shared helpers for the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use threadchat_backend::api::utils::RouterState;
use threadchat_backend::chat::{ChatAdapter, ChatDb, Message};
use threadchat_backend::graph::ConversationGraph;
use threadchat_backend::responder::{ChunkStream, Responder, ResponderError};

/// Responder driven by a fixed script of chunks
///
/// Records every history it is asked to answer.
pub struct ScriptedResponder {
    chunks: Vec<&'static str>,
    fail_with: Option<&'static str>,
    chunk_delay: Duration,
    pub seen: Mutex<Vec<Vec<String>>>,
}

impl ScriptedResponder {
    pub fn replying(chunks: Vec<&'static str>) -> Self {
        Self {
            chunks,
            fail_with: None,
            chunk_delay: Duration::ZERO,
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &'static str) -> Self {
        Self {
            chunks: Vec::new(),
            fail_with: Some(message),
            chunk_delay: Duration::ZERO,
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Wait this long before every chunk after the first
    pub fn with_chunk_delay(mut self, delay: Duration) -> Self {
        self.chunk_delay = delay;
        self
    }

    fn record(&self, history: &[Message]) -> Result<(), ResponderError> {
        self.seen
            .lock()
            .unwrap()
            .push(history.iter().map(|m| m.content.clone()).collect());
        match self.fail_with {
            Some(msg) => Err(ResponderError::Transport(msg.to_string())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Responder for ScriptedResponder {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn respond(&self, history: &[Message]) -> Result<String, ResponderError> {
        self.record(history)?;
        Ok(self.chunks.concat())
    }

    async fn respond_stream(&self, history: &[Message]) -> Result<ChunkStream, ResponderError> {
        self.record(history)?;
        let chunks = self.chunks.clone();
        let delay = self.chunk_delay;
        Ok(Box::pin(async_stream::stream! {
            for (i, chunk) in chunks.into_iter().enumerate() {
                if i > 0 && !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                yield Ok(chunk.to_string());
            }
        }))
    }
}

/// Router state over a throwaway database and the given responder
pub async fn router_state(responder: Arc<dyn Responder>) -> (RouterState, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("chat.db");
    let chat_db = Arc::new(ChatDb::new(db_path.to_str().unwrap()).await.unwrap());
    let graph = Arc::new(ConversationGraph::new(responder, Duration::from_secs(5)));
    let adapter = Arc::new(ChatAdapter::new(chat_db.clone(), graph));
    ((chat_db, adapter), temp_dir)
}
