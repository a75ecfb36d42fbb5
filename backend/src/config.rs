//! Application configuration
//!
//! Centralized configuration management with environment variable support
//! and sensible defaults.

use std::env;

/// Default Gemini model used when `GEMINI_MODEL` is not set
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";

/// Default Gemini API base URL
pub const DEFAULT_GEMINI_API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,
    /// Persistence configuration
    pub persistence: PersistenceConfig,
    /// Responder configuration
    pub responder: ResponderConfig,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to bind the server to
    pub port: u16,
    /// Host address to bind to
    pub host: String,
}

/// Persistence configuration
#[derive(Debug, Clone)]
pub struct PersistenceConfig {
    /// Path to the SQLite database holding conversations
    pub database_path: String,
}

/// Which responder implementation answers chat turns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponderKind {
    /// Google Gemini over HTTP
    Gemini,
    /// Offline responder that echoes the last user message
    Echo,
}

impl ResponderKind {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "gemini" => Some(ResponderKind::Gemini),
            "echo" => Some(ResponderKind::Echo),
            _ => None,
        }
    }
}

/// Responder configuration
#[derive(Clone)]
pub struct ResponderConfig {
    /// Selected responder implementation
    pub kind: ResponderKind,
    /// Gemini API key (empty when not configured)
    pub api_key: String,
    /// Gemini model name
    pub model: String,
    /// Gemini API base URL
    pub base_url: String,
    /// Upper bound for one responder call, in seconds
    pub timeout_secs: u64,
}

// The API key must never end up in logs.
impl std::fmt::Debug for ResponderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponderConfig")
            .field("kind", &self.kind)
            .field("api_key_set", &!self.api_key.is_empty())
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Config {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        let api_key = env::var("GEMINI_API_KEY").unwrap_or_default();
        let kind = env::var("RESPONDER")
            .ok()
            .and_then(|r| ResponderKind::parse(&r))
            .unwrap_or(if api_key.is_empty() {
                ResponderKind::Echo
            } else {
                ResponderKind::Gemini
            });

        Self {
            server: ServerConfig {
                port: env::var("PORT")
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(8080),
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            },
            persistence: PersistenceConfig {
                database_path: env::var("DATABASE_PATH").unwrap_or_else(|_| {
                    // Default to ~/.threadchat or current directory
                    if let Some(home) = env::var_os("HOME") {
                        format!("{}/.threadchat/chat.db", home.to_string_lossy())
                    } else {
                        ".threadchat/chat.db".to_string()
                    }
                }),
            },
            responder: ResponderConfig {
                kind,
                api_key,
                model: env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_GEMINI_MODEL.to_string()),
                base_url: env::var("GEMINI_API_BASE_URL")
                    .unwrap_or_else(|_| DEFAULT_GEMINI_API_BASE_URL.to_string()),
                timeout_secs: env::var("RESPONDER_TIMEOUT_SECS")
                    .ok()
                    .and_then(|t| t.parse().ok())
                    .filter(|t| *t > 0)
                    .unwrap_or(60),
            },
        }
    }

    /// Get the server address as a string
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
