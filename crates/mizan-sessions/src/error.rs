use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The requested thread does not exist in the database.
    #[error("thread not found: {thread_id}")]
    ThreadNotFound { thread_id: String },

    /// The requested task does not exist in the database.
    #[error("task not found: {task_id}")]
    TaskNotFound { task_id: String },

    /// A checkpoint with the same `(thread_id, namespace, checkpoint_id)`
    /// already exists. The log is append-only — saves never overwrite.
    #[error("checkpoint already exists: {thread_id}/{namespace}/{checkpoint_id}")]
    CheckpointExists {
        thread_id: String,
        namespace: String,
        checkpoint_id: String,
    },

    /// The referenced parent checkpoint is missing from the same
    /// thread/namespace.
    #[error("parent checkpoint not found: {parent_checkpoint_id}")]
    ParentNotFound { parent_checkpoint_id: String },

    /// A SQLite operation failed.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Stored state could not be decoded.
    #[error("corrupt stored state: {0}")]
    Corrupt(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;
