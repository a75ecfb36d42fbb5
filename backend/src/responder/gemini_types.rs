//! Gemini API request/response types
//!
//! Structs that mirror the Gemini API JSON format. The same response shape is
//! used for `generateContent` and for each `streamGenerateContent` SSE event.

use crate::chat::models::{Message, MessageRole};
use serde::{Deserialize, Serialize};

/// Top-level Gemini API response
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct GeminiApiResponse {
    /// List of candidate responses from the model
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    /// Optional feedback about the prompt (e.g., if it was blocked)
    #[serde(default, alias = "prompt_feedback")]
    pub prompt_feedback: Option<PromptFeedback>,
}

impl GeminiApiResponse {
    /// Concatenated text of the first candidate, if any
    pub fn first_candidate_text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        Some(content.parts.iter().map(|p| p.text.as_str()).collect())
    }

    /// Block reason reported for the prompt, if any
    pub fn block_reason(&self) -> Option<&str> {
        self.prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.as_deref())
    }
}

/// A single candidate response from the model
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    /// The content of this candidate (absent when generation was stopped early)
    #[serde(default)]
    pub content: Option<Content>,
    /// Why the model stopped generating (if applicable)
    #[serde(default, alias = "finish_reason")]
    pub finish_reason: Option<String>,
}

/// Content structure containing parts of the response
#[derive(Deserialize, Debug)]
pub struct Content {
    /// List of content parts (typically one text part)
    #[serde(default)]
    pub parts: Vec<Part>,
}

/// A single part of content
#[derive(Deserialize, Debug)]
pub struct Part {
    /// The text content of this part
    #[serde(default)]
    pub text: String,
}

/// Feedback about the prompt (e.g., if it was blocked)
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    /// Reason the prompt was blocked (if applicable)
    #[serde(default, alias = "block_reason")]
    pub block_reason: Option<String>,
}

/// Request structure for Gemini API
#[derive(Serialize, Debug)]
pub struct GeminiApiRequest {
    /// Conversation turns, oldest first
    pub contents: Vec<RequestContent>,
}

impl GeminiApiRequest {
    /// Build a request carrying the full conversation history
    pub fn from_history(history: &[Message]) -> Self {
        Self {
            contents: history.iter().map(RequestContent::from).collect(),
        }
    }
}

/// One conversation turn in a request
#[derive(Serialize, Debug)]
pub struct RequestContent {
    /// "user" or "model"
    pub role: &'static str,
    /// List of content parts
    pub parts: Vec<RequestPart>,
}

impl From<&Message> for RequestContent {
    fn from(message: &Message) -> Self {
        let role = match message.role {
            MessageRole::User => "user",
            MessageRole::Assistant => "model",
        };
        Self {
            role,
            parts: vec![RequestPart {
                text: message.content.clone(),
            }],
        }
    }
}

/// A single part for requests (typically text)
#[derive(Serialize, Debug)]
pub struct RequestPart {
    /// The text content
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_maps_roles() {
        let history = vec![
            Message::user("c1", "Hi"),
            Message::assistant("c1", "Hello!"),
            Message::user("c1", "How are you?"),
        ];
        let json = serde_json::to_value(GeminiApiRequest::from_history(&history)).unwrap();

        let roles: Vec<&str> = json["contents"]
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["role"].as_str().unwrap())
            .collect();
        assert_eq!(roles, vec!["user", "model", "user"]);
        assert_eq!(json["contents"][1]["parts"][0]["text"], "Hello!");
    }

    #[test]
    fn test_response_concatenates_parts() {
        let body = r#"{
            "candidates": [{
                "content": {"parts": [{"text": "Hel"}, {"text": "lo!"}], "role": "model"},
                "finishReason": "STOP"
            }]
        }"#;
        let parsed: GeminiApiResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.first_candidate_text().as_deref(), Some("Hello!"));
        assert_eq!(parsed.candidates[0].finish_reason.as_deref(), Some("STOP"));
    }

    #[test]
    fn test_response_block_reason_both_spellings() {
        let camel: GeminiApiResponse =
            serde_json::from_str(r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#).unwrap();
        let snake: GeminiApiResponse =
            serde_json::from_str(r#"{"prompt_feedback": {"block_reason": "SAFETY"}}"#).unwrap();
        assert_eq!(camel.block_reason(), Some("SAFETY"));
        assert_eq!(snake.block_reason(), Some("SAFETY"));
        assert!(camel.first_candidate_text().is_none());
    }

    #[test]
    fn test_candidate_without_content() {
        let parsed: GeminiApiResponse =
            serde_json::from_str(r#"{"candidates": [{"finishReason": "SAFETY"}]}"#).unwrap();
        assert!(parsed.first_candidate_text().is_none());
    }
}
