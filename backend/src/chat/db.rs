//! Chat database operations
//!
//! The Session Store: a durable mapping from conversation id to an ordered,
//! append-only sequence of messages, backed by SQLite.

use crate::chat::models::{
    conversation_title, Conversation, Message, MessageRole, MessageRow, DEFAULT_TITLE,
};
use crate::error::AppError;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{debug, info};

/// Database connection pool for chat operations
pub struct ChatDb {
    pool: SqlitePool,
}

impl ChatDb {
    /// Initialize database connection pool
    ///
    /// # Arguments
    /// * `db_path` - Path to the SQLite database file
    ///
    /// # Returns
    /// * `Ok(ChatDb)` if successful
    /// * `Err(AppError)` if connection failed
    pub async fn new(db_path: &str) -> Result<Self, AppError> {
        // Ensure parent directory exists
        if let Some(parent) = PathBuf::from(db_path.trim_start_matches("sqlite:")).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    AppError::Storage(format!("Failed to create db directory: {}", e))
                })?;
            }
        }

        // SQLite connection string format: sqlite://path/to/db.db
        let connection_string = if db_path.starts_with("sqlite:") {
            db_path.to_string()
        } else {
            format!("sqlite:{}", db_path)
        };

        let options = SqliteConnectOptions::from_str(&connection_string)
            .map_err(|e| AppError::Storage(format!("Invalid database path: {}", e)))?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to connect to database: {}", e)))?;

        info!("Connected to SQLite database at: {}", db_path);

        let db = Self { pool };
        db.run_migrations().await?;

        Ok(db)
    }

    /// Run database migrations
    async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations...");

        let migration_sql = include_str!("../../migrations/001_create_chats.sql");

        for statement in split_sql_statements(migration_sql) {
            sqlx::query(&statement)
                .execute(&self.pool)
                .await
                .map_err(|e| {
                    AppError::Storage(format!(
                        "Migration failed: {} - Statement: {}",
                        e,
                        statement.chars().take(100).collect::<String>()
                    ))
                })?;
        }

        info!("Database migrations completed successfully");
        Ok(())
    }

    /// Create a new, empty conversation and return its id
    ///
    /// Ids are fresh UUIDs; the primary key rejects the (practically impossible)
    /// collision instead of overwriting an existing conversation.
    pub async fn create_conversation(&self) -> Result<String, AppError> {
        let conversation = Conversation::new();
        self.insert_conversation(&conversation).await?;
        Ok(conversation.id)
    }

    /// Insert a fully built conversation row
    pub async fn insert_conversation(&self, conversation: &Conversation) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO conversations (id, title, created_at, updated_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&conversation.id)
        .bind(&conversation.title)
        .bind(conversation.created_at)
        .bind(conversation.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Storage(format!("Failed to create conversation: {}", e)))?;

        debug!(conversation_id = %conversation.id, "Created conversation");
        Ok(())
    }

    /// Get all conversations, most recently created first
    pub async fn list_conversations(&self) -> Result<Vec<Conversation>, AppError> {
        let conversations = sqlx::query_as::<_, Conversation>(
            "SELECT id, title, created_at, updated_at FROM conversations ORDER BY created_at DESC, rowid DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Storage(format!("Failed to fetch conversations: {}", e)))?;

        Ok(conversations)
    }

    /// Get a conversation by ID
    pub async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>, AppError> {
        let conversation = sqlx::query_as::<_, Conversation>(
            "SELECT id, title, created_at, updated_at FROM conversations WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Storage(format!("Failed to fetch conversation: {}", e)))?;

        Ok(conversation)
    }

    /// Get a conversation by ID, failing with `ConversationNotFound`
    pub async fn require_conversation(&self, id: &str) -> Result<Conversation, AppError> {
        self.get_conversation(id)
            .await?
            .ok_or_else(|| AppError::ConversationNotFound(id.to_string()))
    }

    /// Update conversation title and updated_at timestamp
    pub async fn set_title(&self, id: &str, title: &str) -> Result<(), AppError> {
        let updated_at = chrono::Utc::now().timestamp();
        let result = sqlx::query("UPDATE conversations SET title = ?, updated_at = ? WHERE id = ?")
            .bind(title)
            .bind(updated_at)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to update conversation: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(AppError::ConversationNotFound(id.to_string()));
        }

        debug!(conversation_id = %id, "Updated conversation title");
        Ok(())
    }

    /// Get all messages for a conversation, in the order they were appended
    ///
    /// Returns an empty list for a freshly created conversation and
    /// `ConversationNotFound` for an unknown id.
    pub async fn load_messages(&self, conversation_id: &str) -> Result<Vec<Message>, AppError> {
        self.require_conversation(conversation_id).await?;

        let rows = sqlx::query_as::<_, MessageRow>(
            "SELECT id, conversation_id, role, content, created_at FROM messages WHERE conversation_id = ? ORDER BY seq ASC",
        )
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Storage(format!("Failed to fetch messages: {}", e)))?;

        rows.into_iter()
            .map(|row| Message::try_from(row).map_err(AppError::Storage))
            .collect()
    }

    /// Append a message to a conversation
    ///
    /// The existence check, the insert and the `updated_at` touch run in one
    /// transaction: either the message is fully stored or nothing changes.
    pub async fn append_message(
        &self,
        conversation_id: &str,
        message: &Message,
    ) -> Result<(), AppError> {
        self.append(conversation_id, message, false).await
    }

    /// Append a user message, naming the conversation if it is the first one
    ///
    /// The title is derived from the message only while the conversation is
    /// still empty and untitled. Title and message are written in the same
    /// transaction as the append.
    pub async fn append_user_message(
        &self,
        conversation_id: &str,
        message: &Message,
    ) -> Result<(), AppError> {
        if message.role != MessageRole::User {
            return Err(AppError::InvalidRequest(format!(
                "Message {} is not a user message",
                message.id
            )));
        }
        self.append(conversation_id, message, true).await
    }

    async fn append(
        &self,
        conversation_id: &str,
        message: &Message,
        name_if_first: bool,
    ) -> Result<(), AppError> {
        if message.conversation_id != conversation_id {
            return Err(AppError::InvalidRequest(format!(
                "Message {} belongs to conversation {}, not {}",
                message.id, message.conversation_id, conversation_id
            )));
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::Storage(format!("Failed to begin transaction: {}", e)))?;

        let current_title: Option<(String,)> =
            sqlx::query_as("SELECT title FROM conversations WHERE id = ?")
                .bind(conversation_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| AppError::Storage(format!("Failed to fetch conversation: {}", e)))?;

        let Some((current_title,)) = current_title else {
            // Dropping the transaction rolls it back
            return Err(AppError::ConversationNotFound(conversation_id.to_string()));
        };

        let is_first = if name_if_first && current_title == DEFAULT_TITLE {
            let (count,): (i64,) =
                sqlx::query_as("SELECT COUNT(*) FROM messages WHERE conversation_id = ?")
                    .bind(conversation_id)
                    .fetch_one(&mut *tx)
                    .await
                    .map_err(|e| AppError::Storage(format!("Failed to count messages: {}", e)))?;
            count == 0
        } else {
            false
        };

        sqlx::query(
            "INSERT INTO messages (id, conversation_id, role, content, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&message.id)
        .bind(conversation_id)
        .bind(message.role.as_str())
        .bind(&message.content)
        .bind(message.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::Storage(format!("Failed to add message: {}", e)))?;

        // Update conversation's updated_at timestamp
        sqlx::query("UPDATE conversations SET updated_at = ? WHERE id = ?")
            .bind(chrono::Utc::now().timestamp())
            .bind(conversation_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to touch conversation: {}", e)))?;

        if is_first {
            let title = conversation_title(std::slice::from_ref(message));
            sqlx::query("UPDATE conversations SET title = ? WHERE id = ?")
                .bind(&title)
                .bind(conversation_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| AppError::Storage(format!("Failed to name conversation: {}", e)))?;
            debug!(conversation_id = %conversation_id, title = %title, "Named conversation");
        }

        tx.commit()
            .await
            .map_err(|e| AppError::Storage(format!("Failed to commit message: {}", e)))?;

        debug!(
            message_id = %message.id,
            conversation_id = %conversation_id,
            role = message.role.as_str(),
            "Appended message"
        );
        Ok(())
    }

    /// Get the database pool (for advanced operations if needed)
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Split a migration script into executable statements
///
/// Drops comment-only lines and trailing `--` comments, then splits on `;`.
fn split_sql_statements(sql: &str) -> Vec<String> {
    let mut cleaned_sql = String::new();
    for line in sql.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with("--") {
            continue;
        }
        let without_comments = match trimmed.find("--") {
            Some(comment_pos) => &trimmed[..comment_pos],
            None => trimmed,
        };
        cleaned_sql.push_str(without_comments.trim());
        cleaned_sql.push(' ');
    }

    cleaned_sql
        .split(';')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
