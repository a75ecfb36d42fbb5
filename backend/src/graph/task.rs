//! Task implementation for GraphFlow-rs
//!
//! `RespondTask` is the only node of the conversation graph. It reads the
//! message history from the flow context, asks the responder for a reply and
//! stores the reply back in the context. In streaming mode it also forwards
//! every partial chunk to a channel as it arrives.

use crate::chat::models::Message;
use crate::error::AppError;
use crate::graph::constants::{MESSAGES_KEY, REPLY_KEY, RESPOND_TASK_ID};
use crate::responder::{Responder, ResponderError};
use async_trait::async_trait;
use futures_util::StreamExt;
use graph_flow::{Context, GraphError, NextAction, Result as GraphFlowResult, Task, TaskResult};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Sender side of a streaming reply
pub type ChunkSink = mpsc::Sender<Result<String, AppError>>;

/// Task that turns the current message list into the assistant's reply
pub struct RespondTask {
    /// External collaborator producing the reply
    responder: Arc<dyn Responder>,
    /// Where partial chunks go in streaming mode
    chunk_sink: Option<ChunkSink>,
}

impl RespondTask {
    /// Create a task that waits for the complete reply
    pub fn new(responder: Arc<dyn Responder>) -> Self {
        Self {
            responder,
            chunk_sink: None,
        }
    }

    /// Create a task that forwards partial chunks to `sink`
    pub fn streaming(responder: Arc<dyn Responder>, sink: ChunkSink) -> Self {
        Self {
            responder,
            chunk_sink: Some(sink),
        }
    }

    async fn stream_reply(&self, messages: &[Message], sink: &ChunkSink) -> GraphFlowResult<String> {
        let mut chunks = self
            .responder
            .respond_stream(messages)
            .await
            .map_err(responder_failed)?;

        let mut reply = String::new();
        while let Some(chunk) = chunks.next().await {
            let chunk = chunk.map_err(responder_failed)?;
            if chunk.is_empty() {
                continue;
            }
            reply.push_str(&chunk);
            if sink.send(Ok(chunk)).await.is_err() {
                // Receiver dropped, stop consuming the responder
                tracing::debug!(
                    received_len = reply.len(),
                    "Reply stream consumer went away"
                );
                return Err(GraphError::TaskExecutionFailed(
                    "reply stream consumer went away".to_string(),
                ));
            }
        }
        Ok(reply)
    }
}

#[async_trait]
impl Task for RespondTask {
    fn id(&self) -> &str {
        RESPOND_TASK_ID
    }

    async fn run(&self, context: Context) -> GraphFlowResult<TaskResult> {
        let messages: Vec<Message> = context.get(MESSAGES_KEY).await.ok_or_else(|| {
            GraphError::ContextError(format!("context is missing '{}'", MESSAGES_KEY))
        })?;

        tracing::debug!(
            responder = self.responder.name(),
            turns = messages.len(),
            streaming = self.chunk_sink.is_some(),
            "Executing RespondTask"
        );

        let reply = match &self.chunk_sink {
            Some(sink) => self.stream_reply(&messages, sink).await?,
            None => self
                .responder
                .respond(&messages)
                .await
                .map_err(responder_failed)?,
        };

        if reply.trim().is_empty() {
            return Err(responder_failed(ResponderError::EmptyResponse));
        }

        context.set(REPLY_KEY, reply.clone()).await;

        tracing::debug!(reply_len = reply.len(), "RespondTask completed");

        // A conversation turn is a self-loop: the graph ends and waits for the next step
        Ok(TaskResult::new(Some(reply), NextAction::End))
    }
}

fn responder_failed(e: ResponderError) -> GraphError {
    GraphError::TaskExecutionFailed(e.to_string())
}
