//! Integration tests over a real HTTP listener
//!
//! The router is served on an ephemeral port and exercised with reqwest:
//! JSON endpoints, the SSE stream, client disconnects, and the Gemini
//! responder against a mock upstream.

mod common;

use common::{router_state, ScriptedResponder};
use futures_util::StreamExt;
use mockito::{Matcher, Server};
use serde_json::{json, Value};
use serial_test::serial;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use threadchat_backend::api::{build_router, utils::RouterState};
use threadchat_backend::responder::{GeminiResponder, Responder};

async fn serve(state: RouterState) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, build_router(state)).await.unwrap();
    });
    addr
}

/// Parse `data: {json}` frames out of an SSE body
///
/// A trailing frame without its terminating blank line is ignored.
fn sse_frames(body: &str) -> Vec<Value> {
    let mut frames: Vec<&str> = body.split("\n\n").collect();
    frames.pop();
    frames
        .into_iter()
        .filter_map(|frame| frame.strip_prefix("data: "))
        .map(|data| serde_json::from_str(data).unwrap())
        .collect()
}

#[tokio::test]
async fn test_pages_and_health() {
    let (state, _dir) = router_state(Arc::new(ScriptedResponder::replying(vec!["ok"]))).await;
    let addr = serve(state).await;
    let client = reqwest::Client::new();

    for page in ["/", "/streaming", "/history"] {
        let res = client
            .get(format!("http://{}{}", addr, page))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), 200, "page {}", page);
        assert!(res.text().await.unwrap().contains("<html"));
    }

    let health: Value = client
        .get(format!("http://{}/api/health", addr))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "ok");
    assert_eq!(health["responder"], "scripted");
}

#[tokio::test]
async fn test_chat_round_trip_over_http() {
    let (state, _dir) = router_state(Arc::new(ScriptedResponder::replying(vec!["Hello!"]))).await;
    let addr = serve(state).await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("http://{}/api/chat", addr))
        .json(&json!({"message": "Hi"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["response"], "Hello!");
    assert_eq!(body["messages"].as_array().unwrap().len(), 2);

    let id = body["conversation_id"].as_str().unwrap().to_string();
    let listed: Value = client
        .get(format!("http://{}/api/chat/conversations", addr))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listed[0]["id"], id.as_str());
    assert_eq!(listed[0]["title"], "Hi");
}

#[tokio::test]
async fn test_error_statuses() {
    let (state, _dir) = router_state(Arc::new(ScriptedResponder::failing("down"))).await;
    let addr = serve(state).await;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("http://{}/api/chat/conversations/missing", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 404);
    let body: Value = res.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("start a new one"));

    let res = client
        .post(format!("http://{}/api/chat", addr))
        .json(&json!({"message": ""}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 400);

    let res = client
        .post(format!("http://{}/api/chat", addr))
        .json(&json!({"message": "Hi"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 502);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["retryable"], true);
}

#[tokio::test]
async fn test_sse_stream_events() {
    let (state, _dir) = router_state(Arc::new(ScriptedResponder::replying(vec!["Hel", "lo!"]))).await;
    let (chat_db, _) = state.clone();
    let addr = serve(state).await;

    let res = reqwest::Client::new()
        .post(format!("http://{}/api/chat/stream", addr))
        .json(&json!({"message": "Hi"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(
        res.headers()["content-type"].to_str().unwrap(),
        "text/event-stream"
    );

    let frames = sse_frames(&res.text().await.unwrap());
    let types: Vec<&str> = frames.iter().map(|f| f["type"].as_str().unwrap()).collect();
    assert_eq!(types, vec!["start", "chunk", "chunk", "done"]);
    assert_eq!(frames[1]["text"], "Hel");
    assert_eq!(frames[2]["text"], "Hello!");
    assert_eq!(frames[3]["message"]["content"], "Hello!");

    let id = frames[0]["conversation_id"].as_str().unwrap();
    let stored = chat_db.load_messages(id).await.unwrap();
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[1].content, "Hello!");
}

#[tokio::test]
async fn test_client_disconnect_persists_no_reply() {
    let responder = ScriptedResponder::replying(vec!["Hel", "lo", " the", "re", "!"])
        .with_chunk_delay(Duration::from_millis(150));
    let (state, _dir) = router_state(Arc::new(responder)).await;
    let (chat_db, _) = state.clone();
    let addr = serve(state).await;

    let res = reqwest::Client::new()
        .post(format!("http://{}/api/chat/stream", addr))
        .json(&json!({"message": "Hi"}))
        .send()
        .await
        .unwrap();

    // Read until the first chunk frame, then hang up
    let mut body = res.bytes_stream();
    let mut seen = String::new();
    while !seen.contains("\"chunk\"") {
        let bytes = body.next().await.unwrap().unwrap();
        seen.push_str(&String::from_utf8_lossy(&bytes));
    }
    let id = sse_frames(&seen)[0]["conversation_id"]
        .as_str()
        .unwrap()
        .to_string();
    drop(body);

    tokio::time::sleep(Duration::from_millis(1200)).await;

    let stored = chat_db.load_messages(&id).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].content, "Hi");
}

#[tokio::test]
#[serial]
async fn test_gemini_responder_end_to_end() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/models/gemini-2.5-flash:generateContent")
        .match_header("x-goog-api-key", "test-key")
        .match_body(Matcher::PartialJson(json!({
            "contents": [{"role": "user", "parts": [{"text": "Hi"}]}]
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"candidates":[{"content":{"parts":[{"text":"Hello!"}],"role":"model"}}]}"#)
        .create_async()
        .await;

    let responder: Arc<dyn Responder> = Arc::new(GeminiResponder::with_base_url(
        reqwest::Client::new(),
        "test-key".to_string(),
        "gemini-2.5-flash".to_string(),
        server.url(),
    ));
    let (state, _dir) = router_state(responder).await;
    let addr = serve(state).await;

    let body: Value = reqwest::Client::new()
        .post(format!("http://{}/api/chat", addr))
        .json(&json!({"message": "Hi"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(body["response"], "Hello!");
}
