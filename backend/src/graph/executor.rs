//! Conversation graph executor
//!
//! Runs one conversation turn through a single-node graph-flow graph:
//! the history plus the new user message go into the flow context, the
//! respond task produces the reply, and the reply is read back out.
//!
//! Graph-flow sessions here are throwaway in-memory state for one turn.
//! Durable history is the Session Store's job; the caller persists the user
//! message before the step and the assistant message after it.

use crate::chat::models::Message;
use crate::error::AppError;
use crate::graph::constants::{
    CHAT_GRAPH_ID, CHUNK_BUFFER, MAX_RUNS_PER_STEP, MESSAGES_KEY, REPLY_KEY, RESPOND_TASK_ID,
};
use crate::graph::task::RespondTask;
use crate::responder::Responder;
use anyhow::anyhow;
use graph_flow::{
    ExecutionStatus, FlowRunner, Graph, GraphBuilder, InMemorySessionStorage, Session,
    SessionStorage, Task,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{timeout, Duration};
use tokio_stream::wrappers::ReceiverStream;
use uuid::Uuid;

/// Partial reply chunks of a streaming step
///
/// Finite and non-restartable. A failure arrives as a final `Err` item.
/// Dropping the stream cancels the underlying responder call.
pub type ReplyStream = ReceiverStream<Result<String, AppError>>;

/// The Conversation Graph: one state, one self-loop transition per user turn
pub struct ConversationGraph {
    responder: Arc<dyn Responder>,
    timeout: Duration,
}

impl ConversationGraph {
    /// Create a conversation graph around a responder
    ///
    /// # Arguments
    /// * `responder` - External collaborator producing replies
    /// * `timeout` - Upper bound for one step, including the responder call
    pub fn new(responder: Arc<dyn Responder>, timeout: Duration) -> Self {
        Self { responder, timeout }
    }

    /// Name of the responder behind this graph
    pub fn responder_name(&self) -> &str {
        self.responder.name()
    }

    /// Produce the assistant's reply to `user_message`
    ///
    /// `history` must be the exact persisted sequence preceding `user_message`.
    /// Fails with `AppError::Upstream` if the responder fails or times out;
    /// nothing is retried.
    pub async fn step(&self, history: &[Message], user_message: &Message) -> Result<Message, AppError> {
        let messages = turn_context(history, user_message);
        let task = RespondTask::new(self.responder.clone());

        let reply = timeout(self.timeout, run_turn(Arc::new(task), messages))
            .await
            .map_err(|_| timeout_error(self.timeout))??;

        Ok(Message::assistant(&user_message.conversation_id, reply))
    }

    /// Produce the reply as a stream of partial chunks
    ///
    /// The turn runs in a background task. The concatenation of all chunks is
    /// the reply `step` would have returned; the caller persists it once the
    /// stream has ended without error.
    pub fn step_streaming(&self, history: &[Message], user_message: &Message) -> ReplyStream {
        let (tx, rx) = mpsc::channel(CHUNK_BUFFER);
        let messages = turn_context(history, user_message);
        let task = RespondTask::streaming(self.responder.clone(), tx.clone());
        let limit = self.timeout;

        tokio::spawn(async move {
            let error = match timeout(limit, run_turn(Arc::new(task), messages)).await {
                Ok(Ok(_)) => None,
                Ok(Err(e)) => Some(e),
                Err(_) => Some(timeout_error(limit)),
            };
            if let Some(e) = error {
                // The consumer may already be gone; nothing else to do then
                let _ = tx.send(Err(e)).await;
            }
        });

        ReceiverStream::new(rx)
    }
}

/// Build the single-node conversation graph around `task`
pub(crate) fn build_chat_graph(task: Arc<dyn Task>) -> Arc<Graph> {
    let graph = GraphBuilder::new(CHAT_GRAPH_ID)
        .add_task(task)
        .set_start_task(RESPOND_TASK_ID)
        .build();
    Arc::new(graph)
}

fn turn_context(history: &[Message], user_message: &Message) -> Vec<Message> {
    let mut messages = Vec::with_capacity(history.len() + 1);
    messages.extend_from_slice(history);
    messages.push(user_message.clone());
    messages
}

fn timeout_error(limit: Duration) -> AppError {
    AppError::Upstream(format!("responder timed out after {:?}", limit))
}

/// Run one turn through graph-flow and return the reply text
async fn run_turn(task: Arc<dyn Task>, messages: Vec<Message>) -> Result<String, AppError> {
    let graph = build_chat_graph(task);

    // Create session storage (in-memory, lives for this turn only)
    let session_storage: Arc<dyn SessionStorage> = Arc::new(InMemorySessionStorage::new());
    let runner = FlowRunner::new(graph, session_storage.clone());

    let session_id = Uuid::new_v4().to_string();
    let session = Session::new_from_task(session_id.clone(), RESPOND_TASK_ID);
    session.context.set(MESSAGES_KEY, messages).await;

    session_storage
        .save(session)
        .await
        .map_err(|e| AppError::Internal(anyhow!("Failed to save session: {}", e)))?;

    let mut completed = false;
    for _ in 0..MAX_RUNS_PER_STEP {
        let execution_result = runner.run(&session_id).await.map_err(convert_graph_error)?;

        tracing::debug!(
            session_id = %session_id,
            status = ?execution_result.status,
            "Graph execution status update"
        );

        match execution_result.status {
            ExecutionStatus::Completed => {
                completed = true;
                break;
            }
            ExecutionStatus::Paused {
                next_task_id: _,
                reason: _,
            } => continue,
            ExecutionStatus::WaitingForInput => continue,
            ExecutionStatus::Error(err) => {
                return Err(AppError::Upstream(err.to_string()));
            }
        }
    }

    if !completed {
        return Err(AppError::Internal(anyhow!(
            "Conversation graph did not complete within {} runs",
            MAX_RUNS_PER_STEP
        )));
    }

    let final_session = session_storage
        .get(&session_id)
        .await
        .map_err(|e| AppError::Internal(anyhow!("Failed to get final session: {}", e)))?
        .ok_or_else(|| {
            AppError::Internal(anyhow!(
                "Session '{}' not found after execution",
                session_id
            ))
        })?;

    final_session
        .context
        .get::<String>(REPLY_KEY)
        .await
        .ok_or_else(|| AppError::Internal(anyhow!("Respond task produced no reply")))
}

/// Convert graph-flow error to AppError
///
/// Task failures are responder failures; everything else is internal.
fn convert_graph_error(e: graph_flow::GraphError) -> AppError {
    match e {
        graph_flow::GraphError::TaskExecutionFailed(msg) => AppError::Upstream(msg),
        graph_flow::GraphError::GraphNotFound(msg) => {
            AppError::Internal(anyhow!("Graph not found: {}", msg))
        }
        graph_flow::GraphError::InvalidEdge(msg) => {
            AppError::Internal(anyhow!("Invalid edge: {}", msg))
        }
        graph_flow::GraphError::TaskNotFound(msg) => {
            AppError::Internal(anyhow!("Task not found: {}", msg))
        }
        graph_flow::GraphError::ContextError(msg) => {
            AppError::Internal(anyhow!("Context error: {}", msg))
        }
        graph_flow::GraphError::StorageError(msg) => {
            AppError::Internal(anyhow!("Storage error: {}", msg))
        }
        graph_flow::GraphError::SessionNotFound(msg) => {
            AppError::Internal(anyhow!("Session not found: {}", msg))
        }
        graph_flow::GraphError::Other(err) => {
            AppError::Internal(anyhow!("Graph execution error: {}", err))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::responder::{ChunkStream, EchoResponder, ResponderError};
    use async_trait::async_trait;
    use futures_util::StreamExt;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Records the history it was called with and answers with a fixed script
    struct ScriptedResponder {
        reply: Result<Vec<&'static str>, &'static str>,
        seen: Mutex<Vec<Vec<String>>>,
        calls: AtomicUsize,
    }

    impl ScriptedResponder {
        fn chunks(chunks: Vec<&'static str>) -> Self {
            Self {
                reply: Ok(chunks),
                seen: Mutex::new(Vec::new()),
                calls: AtomicUsize::new(0),
            }
        }

        fn failing(message: &'static str) -> Self {
            Self {
                reply: Err(message),
                seen: Mutex::new(Vec::new()),
                calls: AtomicUsize::new(0),
            }
        }

        fn record(&self, history: &[Message]) {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen
                .lock()
                .unwrap()
                .push(history.iter().map(|m| m.content.clone()).collect());
        }
    }

    #[async_trait]
    impl Responder for ScriptedResponder {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn respond(&self, history: &[Message]) -> Result<String, ResponderError> {
            self.record(history);
            match &self.reply {
                Ok(chunks) => Ok(chunks.concat()),
                Err(msg) => Err(ResponderError::Transport(msg.to_string())),
            }
        }

        async fn respond_stream(&self, history: &[Message]) -> Result<ChunkStream, ResponderError> {
            self.record(history);
            match &self.reply {
                Ok(chunks) => {
                    let items: Vec<Result<String, ResponderError>> =
                        chunks.iter().map(|c| Ok(c.to_string())).collect();
                    Ok(Box::pin(futures_util::stream::iter(items)))
                }
                Err(msg) => Err(ResponderError::Transport(msg.to_string())),
            }
        }
    }

    /// Never answers within any reasonable timeout
    struct SlowResponder;

    #[async_trait]
    impl Responder for SlowResponder {
        fn name(&self) -> &str {
            "slow"
        }

        async fn respond(&self, _history: &[Message]) -> Result<String, ResponderError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok("too late".to_string())
        }
    }

    fn graph_with(responder: Arc<dyn Responder>) -> ConversationGraph {
        ConversationGraph::new(responder, Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_step_with_echo_responder() {
        let graph = graph_with(Arc::new(EchoResponder::new()));
        let reply = graph.step(&[], &Message::user("c1", "ping")).await.unwrap();
        assert_eq!(reply.content, "You said: ping");
        assert_eq!(graph.responder_name(), "echo");
    }

    #[tokio::test]
    async fn test_step_returns_assistant_message() {
        let responder = Arc::new(ScriptedResponder::chunks(vec!["Hello!"]));
        let graph = graph_with(responder.clone());
        let user = Message::user("c1", "Hi");

        let reply = graph.step(&[], &user).await.unwrap();

        assert_eq!(reply.content, "Hello!");
        assert_eq!(reply.role, crate::chat::models::MessageRole::Assistant);
        assert_eq!(reply.conversation_id, "c1");
        assert_eq!(*responder.seen.lock().unwrap(), vec![vec!["Hi".to_string()]]);
    }

    #[tokio::test]
    async fn test_step_sees_full_history_in_order() {
        let responder = Arc::new(ScriptedResponder::chunks(vec!["ok"]));
        let graph = graph_with(responder.clone());
        let history = vec![
            Message::user("c1", "one"),
            Message::assistant("c1", "two"),
        ];

        graph
            .step(&history, &Message::user("c1", "three"))
            .await
            .unwrap();

        assert_eq!(
            responder.seen.lock().unwrap()[0],
            vec!["one".to_string(), "two".to_string(), "three".to_string()]
        );
    }

    #[tokio::test]
    async fn test_step_failure_is_upstream_and_not_retried() {
        let responder = Arc::new(ScriptedResponder::failing("connection refused"));
        let graph = graph_with(responder.clone());

        let result = graph.step(&[], &Message::user("c1", "Hi")).await;

        match result {
            Err(AppError::Upstream(msg)) => assert!(msg.contains("connection refused")),
            other => panic!("Expected Upstream error, got {:?}", other),
        }
        assert_eq!(responder.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_step_empty_reply_is_upstream() {
        let graph = graph_with(Arc::new(ScriptedResponder::chunks(vec!["  "])));
        let result = graph.step(&[], &Message::user("c1", "Hi")).await;
        assert!(matches!(result, Err(AppError::Upstream(_))));
    }

    #[tokio::test]
    async fn test_step_timeout_is_upstream() {
        let graph = ConversationGraph::new(Arc::new(SlowResponder), Duration::from_millis(50));
        let result = graph.step(&[], &Message::user("c1", "Hi")).await;
        match result {
            Err(AppError::Upstream(msg)) => assert!(msg.contains("timed out")),
            other => panic!("Expected Upstream timeout, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_step_streaming_yields_chunks() {
        let graph = graph_with(Arc::new(ScriptedResponder::chunks(vec!["Hel", "lo!"])));
        let chunks: Vec<String> = graph
            .step_streaming(&[], &Message::user("c1", "Hi"))
            .map(|c| c.unwrap())
            .collect()
            .await;
        assert_eq!(chunks, vec!["Hel".to_string(), "lo!".to_string()]);
    }

    #[tokio::test]
    async fn test_step_streaming_failure_ends_with_error() {
        let graph = graph_with(Arc::new(ScriptedResponder::failing("boom")));
        let items: Vec<Result<String, AppError>> = graph
            .step_streaming(&[], &Message::user("c1", "Hi"))
            .collect()
            .await;
        assert_eq!(items.len(), 1);
        assert!(matches!(items[0], Err(AppError::Upstream(_))));
    }

    #[tokio::test]
    async fn test_step_streaming_default_single_chunk() {
        let graph = graph_with(Arc::new(SingleChunkResponder));
        let chunks: Vec<String> = graph
            .step_streaming(&[], &Message::user("c1", "Hi"))
            .map(|c| c.unwrap())
            .collect()
            .await;
        assert_eq!(chunks, vec!["whole reply".to_string()]);
    }

    /// Only implements `respond`, so streaming falls back to one chunk
    struct SingleChunkResponder;

    #[async_trait]
    impl Responder for SingleChunkResponder {
        fn name(&self) -> &str {
            "single-chunk"
        }

        async fn respond(&self, _history: &[Message]) -> Result<String, ResponderError> {
            Ok("whole reply".to_string())
        }
    }
}
