//! Streaming utilities for Server-Sent Events (SSE)
//!
//! Turns a stream of render events into a `text/event-stream` response. Each
//! event is one `data: {json}` frame.

use crate::chat::RenderStream;
use crate::error::AppError;
use axum::{
    body::Body,
    http::{header, StatusCode},
    response::Response,
};
use futures_util::{stream::Stream, StreamExt};
use serde_json::json;

/// Create an SSE response from the render events of one turn
///
/// # Arguments
/// * `conversation_id` - Announced in a leading `start` event
/// * `events` - Render events of the turn
///
/// # Returns
/// * `Result<Response, AppError>` - SSE HTTP response or error
pub fn create_sse_stream(conversation_id: String, events: RenderStream) -> Result<Response, AppError> {
    let sse_stream = create_stream(conversation_id, events)
        .map(|frame| Ok::<_, std::io::Error>(format!("data: {}\n\n", frame)));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .header(header::CONNECTION, "keep-alive")
        .body(Body::from_stream(sse_stream))
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to build SSE response: {}", e)))
}

/// Serialize render events to JSON frames
///
/// Dropping the returned stream (client disconnect) drops `events`, which
/// cancels the turn before anything is persisted.
fn create_stream(conversation_id: String, mut events: RenderStream) -> impl Stream<Item = String> {
    use async_stream::stream;

    stream! {
        yield json!({"type": "start", "conversation_id": conversation_id}).to_string();

        while let Some(event) = events.next().await {
            match serde_json::to_string(&event) {
                Ok(frame) => yield frame,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to serialize render event");
                    yield json!({
                        "type": "error",
                        "error": format!("Failed to serialize event: {}", e),
                        "retryable": false,
                    })
                    .to_string();
                    break;
                }
            }
        }
    }
}
