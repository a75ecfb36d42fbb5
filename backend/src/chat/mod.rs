//! Chat module
//!
//! Conversations and messages stored in SQLite, and the adapter the front
//! ends use to drive a conversation.

pub mod adapter;
pub mod db;
pub mod models;

pub use adapter::{ChatAdapter, ConversationView, RenderEvent, RenderStream};
pub use db::ChatDb;
pub use models::{Conversation, Message, MessageRole};
