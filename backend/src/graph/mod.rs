//! Conversation graph module
//!
//! A single-state graph built on graph-flow. Every user turn takes the
//! self-loop transition: history plus the new user message in, one assistant
//! reply out.

pub mod constants;
pub mod executor;
pub(crate) mod task;

pub use executor::{ConversationGraph, ReplyStream};
