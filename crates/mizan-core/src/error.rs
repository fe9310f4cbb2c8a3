use thiserror::Error;

#[derive(Debug, Error)]
pub enum MizanError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("LLM provider error: {0}")]
    Provider(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Not found: {resource} {id}")]
    NotFound { resource: String, id: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MizanError {
    /// Short error code string sent to clients in error frames and bodies.
    pub fn code(&self) -> &'static str {
        match self {
            MizanError::Config(_) => "CONFIG_ERROR",
            MizanError::InvalidRequest(_) => "INVALID_REQUEST",
            MizanError::Provider(_) => "PROVIDER_ERROR",
            MizanError::Database(_) => "DATABASE_ERROR",
            MizanError::NotFound { .. } => "NOT_FOUND",
            MizanError::Serialization(_) => "SERIALIZATION_ERROR",
            MizanError::Io(_) => "IO_ERROR",
            MizanError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, MizanError>;
