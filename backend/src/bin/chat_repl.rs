//! Terminal front end
//!
//! Same adapter as the browser pages, driven from stdin. Replies stream to
//! stdout as they arrive.
//!
//! Commands: `/new`, `/list`, `/select <n|id>`, `/close`, `/quit`. Anything
//! else is sent as a message.

use futures_util::StreamExt;
use std::io::Write;
use threadchat_backend::api::utils::init_state;
use threadchat_backend::chat::{ChatAdapter, Message, RenderEvent};
use threadchat_backend::config::Config;
use threadchat_backend::state::SessionPointer;
use tokio::io::{AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let config = Config::from_env();
    let (_, adapter) = init_state(&config)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to initialize chat state: {}", e))?;

    println!(
        "threadchat ({} responder). /new, /list, /select <n|id>, /close, /quit",
        adapter.responder_name()
    );

    let mut pointer = SessionPointer::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    prompt()?;
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        let result = match line.split_once(' ').unwrap_or((line, "")) {
            ("", _) => Ok(()),
            ("/quit", _) => break,
            ("/new", _) => adapter
                .new_conversation(&mut pointer)
                .await
                .map(|id| println!("Started conversation {}", id)),
            ("/list", _) => list(&adapter, &pointer).await,
            ("/select", target) => select(&adapter, &mut pointer, target.trim()).await,
            ("/close", _) => {
                pointer.clear();
                println!("No conversation selected");
                Ok(())
            }
            _ => send(&adapter, &mut pointer, line).await,
        };
        if let Err(e) = result {
            println!("error: {}", e);
        }
        prompt()?;
    }

    Ok(())
}

fn prompt() -> std::io::Result<()> {
    print!("> ");
    std::io::stdout().flush()
}

async fn list(
    adapter: &ChatAdapter,
    pointer: &SessionPointer,
) -> Result<(), threadchat_backend::error::AppError> {
    let conversations = adapter.list_conversations().await?;
    if conversations.is_empty() {
        println!("No conversations yet");
    }
    for (i, c) in conversations.iter().enumerate() {
        let marker = if pointer.current() == Some(c.id.as_str()) {
            "*"
        } else {
            " "
        };
        println!(
            "{}{:>3}. {}  ({}, {})",
            marker,
            i + 1,
            c.title,
            c.created_at_datetime().format("%Y-%m-%d %H:%M"),
            c.id
        );
    }
    Ok(())
}

async fn select(
    adapter: &ChatAdapter,
    pointer: &mut SessionPointer,
    target: &str,
) -> Result<(), threadchat_backend::error::AppError> {
    // Accept a 1-based index from /list or a raw id
    let id = match target.parse::<usize>() {
        Ok(n) if n > 0 => adapter
            .list_conversations()
            .await?
            .get(n - 1)
            .map(|c| c.id.clone())
            .unwrap_or_else(|| target.to_string()),
        _ => target.to_string(),
    };

    let view = adapter.select_conversation(pointer, &id).await?;
    println!("== {} ==", view.conversation.title);
    for message in &view.messages {
        print_message(message);
    }
    Ok(())
}

async fn send(
    adapter: &ChatAdapter,
    pointer: &mut SessionPointer,
    content: &str,
) -> Result<(), threadchat_backend::error::AppError> {
    threadchat_backend::chat::adapter::validate_message(content)?;
    adapter.ensure_conversation(pointer).await?;

    let mut events = adapter.send_message_streaming(pointer, content).await?;
    print!("assistant: ");
    while let Some(event) = events.next().await {
        match event {
            RenderEvent::Chunk { delta, .. } => {
                print!("{}", delta);
                let _ = std::io::stdout().flush();
            }
            RenderEvent::Done { .. } => println!(),
            RenderEvent::Error { error, retryable } => {
                println!();
                println!(
                    "error: {}{}",
                    error,
                    if retryable { " (you can retry)" } else { "" }
                );
            }
        }
    }
    Ok(())
}

fn print_message(message: &Message) {
    println!(
        "[{}] {}: {}",
        message.created_at_datetime().format("%H:%M:%S"),
        message.role.as_str(),
        message.content
    );
}
