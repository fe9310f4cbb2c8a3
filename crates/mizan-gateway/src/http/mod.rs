pub mod chat;
pub mod documents;
pub mod health;
pub mod stream;
pub mod tasks;

use axum::Json;
use serde::Serialize;

/// Structured error body returned on synchronous rejections (no stream is
/// opened for these).
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

impl ErrorBody {
    pub fn new(code: &str, message: impl Into<String>) -> Json<Self> {
        Json(Self {
            code: code.to_string(),
            message: message.into(),
        })
    }
}
