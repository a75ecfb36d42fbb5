//! Conversation graph constants
//!
//! Ids and context keys shared by the graph builder and its task.

/// Graph id for the conversation graph
pub const CHAT_GRAPH_ID: &str = "chat";

/// Id of the single task node that asks the responder for a reply
pub const RESPOND_TASK_ID: &str = "respond";

/// Context key holding the ordered messages the responder sees
pub const MESSAGES_KEY: &str = "messages";

/// Context key the respond task writes the finished reply to
pub const REPLY_KEY: &str = "reply";

/// Buffered chunks between the respond task and a streaming consumer
pub const CHUNK_BUFFER: usize = 64;

/// Upper bound on runner invocations for one step
pub const MAX_RUNS_PER_STEP: usize = 4;
