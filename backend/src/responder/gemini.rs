//! Gemini API responder
//!
//! Direct HTTP client for the Gemini API. `respond` uses `generateContent`;
//! `respond_stream` uses `streamGenerateContent` with `alt=sse` and yields the
//! text of each event as one chunk.

use crate::chat::models::Message;
use crate::config::{ResponderConfig, DEFAULT_GEMINI_API_BASE_URL};
use crate::responder::gemini_types::{GeminiApiRequest, GeminiApiResponse};
use crate::responder::{ChunkStream, Responder, ResponderError};
use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest_eventsource::{Event, RequestBuilderExt};

/// Header carrying the API key (keeps the key out of logged URLs)
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Responder backed by Google's Gemini API
pub struct GeminiResponder {
    /// Shared HTTP client (connection pooling)
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiResponder {
    /// Create a responder against the public Gemini endpoint
    pub fn new(api_key: String, model: String) -> Self {
        Self::with_base_url(
            reqwest::Client::new(),
            api_key,
            model,
            DEFAULT_GEMINI_API_BASE_URL.to_string(),
        )
    }

    /// Create a responder against a custom base URL (used by tests)
    pub fn with_base_url(
        client: reqwest::Client,
        api_key: String,
        model: String,
        base_url: String,
    ) -> Self {
        Self {
            client,
            api_key,
            model,
            base_url,
        }
    }

    /// Build a responder from application configuration
    pub fn from_config(config: &ResponderConfig) -> Self {
        Self::with_base_url(
            reqwest::Client::new(),
            config.api_key.clone(),
            config.model.clone(),
            config.base_url.clone(),
        )
    }

    fn endpoint(&self, method: &str) -> String {
        format!(
            "{}/models/{}:{}",
            self.base_url.trim_end_matches('/'),
            self.model,
            method
        )
    }

    fn check_request(&self, history: &[Message]) -> Result<(), ResponderError> {
        if self.api_key.is_empty() {
            return Err(ResponderError::MissingApiKey);
        }
        if history.is_empty() {
            return Err(ResponderError::EmptyConversation);
        }
        Ok(())
    }
}

#[async_trait]
impl Responder for GeminiResponder {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn respond(&self, history: &[Message]) -> Result<String, ResponderError> {
        self.check_request(history)?;

        let url = self.endpoint("generateContent");
        let request_body = GeminiApiRequest::from_history(history);

        tracing::debug!(
            url = %url,
            model = %self.model,
            turns = history.len(),
            "Calling Gemini API"
        );

        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| ResponderError::Transport(e.to_string()))?;

        // Check HTTP status
        let status = response.status();
        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error body".to_string());
            return Err(status_error(status.as_u16(), error_body));
        }

        let response_body = response
            .text()
            .await
            .map_err(|e| ResponderError::Transport(e.to_string()))?;

        let text = parse_response_text(&response_body)?;

        tracing::debug!(
            response_len = text.len(),
            "Successfully received response from Gemini API"
        );

        Ok(text)
    }

    async fn respond_stream(&self, history: &[Message]) -> Result<ChunkStream, ResponderError> {
        self.check_request(history)?;

        let url = format!("{}?alt=sse", self.endpoint("streamGenerateContent"));
        let request_body = GeminiApiRequest::from_history(history);

        tracing::debug!(
            url = %url,
            model = %self.model,
            turns = history.len(),
            "Opening Gemini event stream"
        );

        let mut es = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&request_body)
            .eventsource()
            .map_err(|e| ResponderError::Transport(e.to_string()))?;

        let stream = async_stream::stream! {
            while let Some(event) = es.next().await {
                match event {
                    Ok(Event::Open) => {
                        tracing::debug!("Gemini event stream opened");
                    }
                    Ok(Event::Message(msg)) => match parse_stream_event(&msg.data) {
                        Ok(Some(text)) => yield Ok(text),
                        Ok(None) => {}
                        Err(e) => {
                            yield Err(e);
                            break;
                        }
                    },
                    Err(reqwest_eventsource::Error::StreamEnded) => break,
                    Err(reqwest_eventsource::Error::InvalidStatusCode(status, response)) => {
                        let body = response
                            .text()
                            .await
                            .unwrap_or_else(|_| "Unable to read error body".to_string());
                        yield Err(status_error(status.as_u16(), body));
                        break;
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "Gemini event stream failed");
                        yield Err(ResponderError::Transport(err.to_string()));
                        break;
                    }
                }
            }
            // Never let the event source reconnect on its own
            es.close();
        };

        Ok(Box::pin(stream))
    }
}

/// Map a non-success HTTP status to a responder error
fn status_error(status: u16, body: String) -> ResponderError {
    tracing::error!(
        status_code = status,
        error_body = %body,
        "Gemini API returned error status"
    );
    if status == 429 {
        ResponderError::RateLimited(body)
    } else {
        ResponderError::Api { status, body }
    }
}

/// Extract the reply text from a `generateContent` response body
fn parse_response_text(body: &str) -> Result<String, ResponderError> {
    let parsed: GeminiApiResponse = serde_json::from_str(body)
        .map_err(|e| ResponderError::InvalidResponse(format!("{} - Response body: {}", e, body)))?;

    if let Some(reason) = parsed.block_reason() {
        return Err(ResponderError::Blocked(reason.to_string()));
    }

    match parsed.first_candidate_text() {
        Some(text) if !text.is_empty() => Ok(text),
        _ => Err(ResponderError::EmptyResponse),
    }
}

/// Extract the text of one streamed event, `None` when it carries none
fn parse_stream_event(data: &str) -> Result<Option<String>, ResponderError> {
    let parsed: GeminiApiResponse = serde_json::from_str(data)
        .map_err(|e| ResponderError::InvalidResponse(format!("{} - Event data: {}", e, data)))?;

    if let Some(reason) = parsed.block_reason() {
        return Err(ResponderError::Blocked(reason.to_string()));
    }

    Ok(parsed.first_candidate_text().filter(|t| !t.is_empty()))
}
