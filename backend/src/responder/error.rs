//! Responder-specific error types
//!
//! Errors raised by the external responder collaborator (HTTP failures,
//! rejected prompts, malformed payloads). They surface to users as
//! `AppError::Upstream`.

use thiserror::Error;

/// Errors that can occur while asking a responder for a reply
#[derive(Error, Debug)]
pub enum ResponderError {
    /// No API key configured for a remote responder
    #[error("API key is empty")]
    MissingApiKey,

    /// The HTTP request could not be sent or the connection dropped
    #[error("Failed to reach responder: {0}")]
    Transport(String),

    /// The API answered with a non-success status
    #[error("Responder returned error status {status}: {body}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Response body, for diagnostics
        body: String,
    },

    /// The API rejected the call because of rate limiting (HTTP 429)
    #[error("Responder rate limit exceeded (HTTP 429): {0}")]
    RateLimited(String),

    /// The model refused the prompt
    #[error("Responder blocked the prompt: {0}")]
    Blocked(String),

    /// The response parsed but carried no text
    #[error("Responder returned no content")]
    EmptyResponse,

    /// The response body could not be parsed
    #[error("Failed to parse responder response: {0}")]
    InvalidResponse(String),

    /// There is no user message to answer
    #[error("Conversation has no user message to answer")]
    EmptyConversation,
}
