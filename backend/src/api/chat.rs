//! Chat API endpoints
//!
//! Handles HTTP requests for chat conversations and messages.

use crate::api::streaming::create_sse_stream;
use crate::api::utils::{pointer_from_request, RouterState};
use crate::chat::{Conversation, ConversationView, Message};
use crate::error::AppError;
use crate::state::SessionPointer;
use axum::{
    extract::{Path, State},
    response::{Json, Response},
};
use serde::{Deserialize, Serialize};

/// Request to create a new conversation
#[derive(Debug, Default, Deserialize)]
pub struct CreateConversationRequest {
    /// Optional title (derived from the first message if not provided)
    #[serde(default)]
    pub title: Option<String>,
}

/// Request to send a message
#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    /// Message content
    pub message: String,
    /// Selected conversation; a new one is created when absent
    #[serde(default)]
    pub conversation_id: Option<String>,
}

/// Request to update conversation title
#[derive(Debug, Deserialize)]
pub struct UpdateTitleRequest {
    /// New title
    pub title: String,
}

/// Reply to a sent message
#[derive(Debug, Serialize)]
pub struct SendMessageResponse {
    /// Conversation the message went to (same as input or newly created)
    pub conversation_id: String,
    /// Text of the assistant's reply
    pub response: String,
    /// The conversation after the turn
    pub conversation: Conversation,
    /// Full message list, ready to re-render
    pub messages: Vec<Message>,
}

impl From<ConversationView> for SendMessageResponse {
    fn from(view: ConversationView) -> Self {
        let response = view
            .messages
            .last()
            .map(|m| m.content.clone())
            .unwrap_or_default();
        Self {
            conversation_id: view.conversation.id.clone(),
            response,
            conversation: view.conversation,
            messages: view.messages,
        }
    }
}

/// GET /api/chat/conversations - List all conversations
pub async fn list_conversations(
    State((_, adapter)): State<RouterState>,
) -> Result<Json<Vec<Conversation>>, AppError> {
    let conversations = adapter.list_conversations().await?;
    Ok(Json(conversations))
}

/// POST /api/chat/conversations - Create a new conversation
pub async fn create_conversation(
    State((_, adapter)): State<RouterState>,
    Json(request): Json<CreateConversationRequest>,
) -> Result<Json<Conversation>, AppError> {
    let mut pointer = SessionPointer::new();
    let conversation = adapter
        .create_titled_conversation(&mut pointer, request.title.as_deref())
        .await?;
    Ok(Json(conversation))
}

/// GET /api/chat/conversations/:id - Select a conversation and load its messages
pub async fn get_conversation(
    State((_, adapter)): State<RouterState>,
    Path(id): Path<String>,
) -> Result<Json<ConversationView>, AppError> {
    let mut pointer = SessionPointer::new();
    let view = adapter.select_conversation(&mut pointer, &id).await?;
    Ok(Json(view))
}

/// PUT /api/chat/conversations/:id/title - Update conversation title
pub async fn update_conversation_title(
    State((chat_db, adapter)): State<RouterState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateTitleRequest>,
) -> Result<Json<Conversation>, AppError> {
    adapter.rename_conversation(&id, &request.title).await?;
    let conversation = chat_db.require_conversation(&id).await?;
    Ok(Json(conversation))
}

/// POST /api/chat - Send a message and wait for the full reply
pub async fn send_message(
    State((_, adapter)): State<RouterState>,
    Json(request): Json<SendMessageRequest>,
) -> Result<Json<SendMessageResponse>, AppError> {
    crate::chat::adapter::validate_message(&request.message)?;

    let mut pointer = pointer_from_request(request.conversation_id);
    adapter.ensure_conversation(&mut pointer).await?;

    let view = adapter.send_message(&pointer, &request.message).await?;
    Ok(Json(view.into()))
}

/// POST /api/chat/stream - Send a message and stream the reply as SSE
///
/// The first event is `{"type":"start","conversation_id":...}` so a page that
/// sent no id learns the one created for it.
pub async fn send_message_stream(
    State((_, adapter)): State<RouterState>,
    Json(request): Json<SendMessageRequest>,
) -> Result<Response, AppError> {
    crate::chat::adapter::validate_message(&request.message)?;

    let mut pointer = pointer_from_request(request.conversation_id);
    let conversation_id = adapter.ensure_conversation(&mut pointer).await?;

    let events = adapter
        .send_message_streaming(&pointer, &request.message)
        .await?;
    create_sse_stream(conversation_id, events)
}
