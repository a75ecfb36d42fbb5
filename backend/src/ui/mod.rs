//! Browser front ends
//!
//! Three pages embedded in the binary, each a little richer than the last:
//! plain request/response chat, streaming chat, and streaming chat with a
//! conversation picker backed by persisted history. The pages keep their
//! session pointer (the selected conversation id) client-side.

use axum::response::Html;

const BASIC_PAGE: &str = include_str!("pages/basic.html");
const STREAMING_PAGE: &str = include_str!("pages/streaming.html");
const HISTORY_PAGE: &str = include_str!("pages/history.html");

/// GET / - basic chat
pub async fn basic_page() -> Html<&'static str> {
    Html(BASIC_PAGE)
}

/// GET /streaming - chat with incrementally rendered replies
pub async fn streaming_page() -> Html<&'static str> {
    Html(STREAMING_PAGE)
}

/// GET /history - streaming chat with a conversation picker
pub async fn history_page() -> Html<&'static str> {
    Html(HISTORY_PAGE)
}
