//! Front-end adapter
//!
//! Glue between a UI session and the chat core. Every call takes the
//! session's `SessionPointer` explicitly; only `new_conversation` and
//! `select_conversation` move it.
//!
//! A turn appends the user message, steps the conversation graph with the
//! full persisted history, then appends the assistant reply. If the step
//! fails, only the user message is stored.

use crate::chat::db::ChatDb;
use crate::chat::models::{Conversation, Message};
use crate::error::AppError;
use crate::graph::ConversationGraph;
use crate::state::SessionPointer;
use futures_util::stream::Stream;
use futures_util::StreamExt;
use serde::Serialize;
use std::pin::Pin;
use std::sync::Arc;
use tracing::{info, info_span, warn, Instrument, Span};

/// Maximum message length in characters
pub const MAX_MESSAGE_LENGTH: usize = 10_000;

/// A conversation together with its full message list
#[derive(Debug, Clone, Serialize)]
pub struct ConversationView {
    /// The conversation row
    pub conversation: Conversation,
    /// Every message in append order
    pub messages: Vec<Message>,
}

/// One incremental update of a streaming reply
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum RenderEvent {
    /// A new chunk arrived; `text` is everything received so far
    Chunk { delta: String, text: String },
    /// The reply is complete and has been persisted
    Done { message: Message },
    /// The turn failed; nothing of the reply was persisted
    Error { error: String, retryable: bool },
}

/// Render events of one streaming turn
pub type RenderStream = Pin<Box<dyn Stream<Item = RenderEvent> + Send>>;

/// Validate user message content
///
/// # Returns
/// * `Ok(())` - Message is valid
/// * `Err(AppError)` - Message is empty or too long
pub fn validate_message(content: &str) -> Result<(), AppError> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(AppError::InvalidRequest(
            "Message cannot be empty".to_string(),
        ));
    }
    if trimmed.chars().count() > MAX_MESSAGE_LENGTH {
        return Err(AppError::InvalidRequest(format!(
            "Message exceeds maximum length of {} characters",
            MAX_MESSAGE_LENGTH
        )));
    }
    Ok(())
}

fn validate_title(title: &str) -> Result<&str, AppError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(AppError::InvalidRequest(
            "Title cannot be empty".to_string(),
        ));
    }
    Ok(title)
}

/// Adapter shared by the HTTP handlers and the terminal front end
pub struct ChatAdapter {
    db: Arc<ChatDb>,
    graph: Arc<ConversationGraph>,
}

impl ChatAdapter {
    /// Create an adapter over a session store and a conversation graph
    pub fn new(db: Arc<ChatDb>, graph: Arc<ConversationGraph>) -> Self {
        Self { db, graph }
    }

    /// The underlying session store
    pub fn db(&self) -> &Arc<ChatDb> {
        &self.db
    }

    /// Name of the responder behind the conversation graph
    pub fn responder_name(&self) -> &str {
        self.graph.responder_name()
    }

    /// All conversations, newest first
    pub async fn list_conversations(&self) -> Result<Vec<Conversation>, AppError> {
        self.db.list_conversations().await
    }

    /// Create a conversation and point the session at it
    pub async fn new_conversation(&self, pointer: &mut SessionPointer) -> Result<String, AppError> {
        let id = self.db.create_conversation().await?;
        pointer.select(id.clone());
        info!(conversation_id = %id, "New conversation");
        Ok(id)
    }

    /// Create a conversation with an optional explicit title
    ///
    /// The title is checked before anything is written.
    pub async fn create_titled_conversation(
        &self,
        pointer: &mut SessionPointer,
        title: Option<&str>,
    ) -> Result<Conversation, AppError> {
        let conversation = match title {
            Some(title) => Conversation::with_title(validate_title(title)?.to_string()),
            None => Conversation::new(),
        };
        self.db.insert_conversation(&conversation).await?;
        pointer.select(conversation.id.clone());
        info!(conversation_id = %conversation.id, "New conversation");
        Ok(conversation)
    }

    /// Point the session at an existing conversation and load it
    ///
    /// The pointer is left untouched when the conversation does not exist.
    pub async fn select_conversation(
        &self,
        pointer: &mut SessionPointer,
        conversation_id: &str,
    ) -> Result<ConversationView, AppError> {
        let view = self.view(conversation_id).await?;
        pointer.select(conversation_id);
        Ok(view)
    }

    /// Make sure the session points at a conversation, creating one if needed
    pub async fn ensure_conversation(
        &self,
        pointer: &mut SessionPointer,
    ) -> Result<String, AppError> {
        match pointer.current() {
            Some(id) => Ok(id.to_string()),
            None => self.new_conversation(pointer).await,
        }
    }

    /// Rename a conversation
    pub async fn rename_conversation(&self, conversation_id: &str, title: &str) -> Result<(), AppError> {
        let title = validate_title(title)?;
        self.db.set_title(conversation_id, title).await
    }

    /// Send a message in the selected conversation and wait for the reply
    ///
    /// Returns the re-rendered conversation including both new messages.
    pub async fn send_message(
        &self,
        pointer: &SessionPointer,
        content: &str,
    ) -> Result<ConversationView, AppError> {
        let conversation_id = selected(pointer)?;
        let span = turn_span(&conversation_id);

        async {
            let (history, user_message) = self.begin_turn(&conversation_id, content).await?;

            let reply = self.graph.step(&history, &user_message).await.map_err(|e| {
                warn!(error = %e, "Step failed, keeping user message only");
                e
            })?;

            self.db.append_message(&conversation_id, &reply).await?;
            info!(reply_len = reply.content.len(), "Turn completed");

            self.view(&conversation_id).await
        }
        .instrument(span)
        .await
    }

    /// Send a message and receive the reply as incremental render events
    ///
    /// The user message is stored before this returns. The assistant message
    /// is stored once, after the last chunk; dropping the stream earlier
    /// stores nothing.
    pub async fn send_message_streaming(
        &self,
        pointer: &SessionPointer,
        content: &str,
    ) -> Result<RenderStream, AppError> {
        let conversation_id = selected(pointer)?;
        let span = turn_span(&conversation_id);

        let (history, user_message) = self
            .begin_turn(&conversation_id, content)
            .instrument(span.clone())
            .await?;

        let mut chunks = {
            let _guard = span.enter();
            self.graph.step_streaming(&history, &user_message)
        };
        let db = self.db.clone();

        let events = async_stream::stream! {
            let mut text = String::new();
            while let Some(chunk) = chunks.next().await {
                match chunk {
                    Ok(delta) => {
                        text.push_str(&delta);
                        yield RenderEvent::Chunk { delta, text: text.clone() };
                    }
                    Err(e) => {
                        span.in_scope(|| warn!(error = %e, "Streaming step failed, keeping user message only"));
                        yield error_event(&e);
                        return;
                    }
                }
            }

            let reply = Message::assistant(&conversation_id, text);
            match db.append_message(&conversation_id, &reply).instrument(span.clone()).await {
                Ok(()) => {
                    span.in_scope(|| info!(reply_len = reply.content.len(), "Streaming turn completed"));
                    yield RenderEvent::Done { message: reply };
                }
                Err(e) => yield error_event(&e),
            }
        };

        Ok(Box::pin(events))
    }

    /// Validate input, load the history and append the user message
    async fn begin_turn(
        &self,
        conversation_id: &str,
        content: &str,
    ) -> Result<(Vec<Message>, Message), AppError> {
        validate_message(content)?;

        let history = self.db.load_messages(conversation_id).await?;

        // Names the conversation in the same write when this is its first message
        let user_message = Message::user(conversation_id, content);
        self.db
            .append_user_message(conversation_id, &user_message)
            .await?;

        info!(history_len = history.len(), "User message stored");
        Ok((history, user_message))
    }

    async fn view(&self, conversation_id: &str) -> Result<ConversationView, AppError> {
        let conversation = self.db.require_conversation(conversation_id).await?;
        let messages = self.db.load_messages(conversation_id).await?;
        Ok(ConversationView {
            conversation,
            messages,
        })
    }
}

fn selected(pointer: &SessionPointer) -> Result<String, AppError> {
    pointer
        .current()
        .map(str::to_string)
        .ok_or_else(|| AppError::InvalidRequest("No conversation selected".to_string()))
}

fn turn_span(conversation_id: &str) -> Span {
    info_span!("chat_turn", conversation_id = %conversation_id)
}

fn error_event(e: &AppError) -> RenderEvent {
    RenderEvent::Error {
        error: e.to_string(),
        retryable: e.is_retryable(),
    }
}
