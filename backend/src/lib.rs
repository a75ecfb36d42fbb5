//! threadchat backend library
//!
//! This library exposes modules for testing and external use.
//! The server binary is in `src/main.rs`, the terminal front end in
//! `src/bin/chat_repl.rs`.

pub mod api;
pub mod chat;
pub mod config;
pub mod error;
/// Single-node conversation graph on graph-flow
pub mod graph;
pub mod responder;
/// Per-UI-session state
pub mod state;
pub mod ui;
