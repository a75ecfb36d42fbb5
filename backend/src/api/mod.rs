//! API module
//!
//! HTTP request handlers and the router that ties them to the pages.

pub mod chat;
pub mod streaming;
pub mod utils;

use crate::ui;
use axum::{
    extract::Request,
    middleware::Next,
    response::{Json, Response},
    routing::{get, post, put},
    Router,
};
use serde::Serialize;
use std::time::Instant;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, info_span, Instrument};
use utils::RouterState;
use uuid::Uuid;

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    responder: String,
}

/// GET /api/health
async fn health_check(
    axum::extract::State((_, adapter)): axum::extract::State<RouterState>,
) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        responder: adapter.responder_name().to_string(),
    })
}

/// Request ID middleware - adds unique ID to each request for tracing
async fn request_id_middleware(request: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let span = info_span!(
        "request",
        request_id = %request_id,
        method = %method,
        uri = %uri,
    );

    let response = next.run(request).instrument(span).await;

    info!(
        request_id = %request_id,
        method = %method,
        uri = %uri,
        status = %response.status().as_u16(),
        duration_ms = start.elapsed().as_millis(),
        "Request completed"
    );

    response
}

/// Build the application router: three pages plus the chat API
pub fn build_router(state: RouterState) -> Router {
    Router::new()
        // Front ends
        .route("/", get(ui::basic_page))
        .route("/streaming", get(ui::streaming_page))
        .route("/history", get(ui::history_page))
        .route("/api/health", get(health_check))
        // Conversations
        .route(
            "/api/chat/conversations",
            get(chat::list_conversations).post(chat::create_conversation),
        )
        .route("/api/chat/conversations/:id", get(chat::get_conversation))
        .route(
            "/api/chat/conversations/:id/title",
            put(chat::update_conversation_title),
        )
        // Messages
        .route("/api/chat", post(chat::send_message))
        .route("/api/chat/stream", post(chat::send_message_stream))
        // Middleware (order matters - request_id should be first)
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                )
            }),
        )
        .layer(CorsLayer::permissive()) // Allow CORS for development
        .with_state(state)
}
