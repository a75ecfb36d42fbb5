//! API utility functions
//!
//! Shared router state and helpers used by the chat handlers.

use crate::chat::{ChatAdapter, ChatDb};
use crate::config::Config;
use crate::error::AppError;
use crate::graph::ConversationGraph;
use crate::responder::build_responder;
use crate::state::SessionPointer;
use std::sync::Arc;
use std::time::Duration;

/// State shared by every route: the session store and the front-end adapter
pub type RouterState = (Arc<ChatDb>, Arc<ChatAdapter>);

/// Open the session store and wire the responder, graph and adapter together
pub async fn init_state(config: &Config) -> Result<RouterState, AppError> {
    let chat_db = Arc::new(ChatDb::new(&config.persistence.database_path).await?);

    let responder = build_responder(&config.responder);
    tracing::info!(
        responder = responder.name(),
        timeout_secs = config.responder.timeout_secs,
        "Responder ready"
    );

    let graph = Arc::new(ConversationGraph::new(
        responder,
        Duration::from_secs(config.responder.timeout_secs),
    ));
    let adapter = Arc::new(ChatAdapter::new(chat_db.clone(), graph));
    Ok((chat_db, adapter))
}

/// Rebuild the session pointer a browser page carries client-side
///
/// Blank ids count as "nothing selected".
pub fn pointer_from_request(conversation_id: Option<String>) -> SessionPointer {
    match conversation_id {
        Some(id) if !id.trim().is_empty() => SessionPointer::at(id.trim()),
        _ => SessionPointer::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pointer_from_request() {
        assert_eq!(pointer_from_request(None).current(), None);
        assert_eq!(pointer_from_request(Some("  ".to_string())).current(), None);
        assert_eq!(
            pointer_from_request(Some(" abc ".to_string())).current(),
            Some("abc")
        );
    }
}
