//! Conversational endpoint — POST /v1/chat
//!
//! Request:  `{"thread_id": "optional", "message": "hello"}`
//! Response: an SSE stream of typed frames (see mizan-protocol). The routing
//! decision — general chat vs. contract analysis, direct vs. full pipeline —
//! happens here, before the stream opens.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

use mizan_agent::pipeline::PipelineRequest;
use mizan_agent::provider::{Message, Role};
use mizan_agent::route::{estimate_complexity, route, Complexity};
use mizan_agent::sanitize::sanitize;

use crate::app::AppState;
use crate::http::ErrorBody;

/// Turns of history handed to the model per request.
const HISTORY_LIMIT: usize = 40;

#[derive(Deserialize)]
pub struct ChatBody {
    pub thread_id: Option<String>,
    pub message: String,
}

pub async fn chat_handler(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ChatBody>,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorBody>)> {
    let message = sanitize(&body.message, state.config.pipeline.max_input_chars);
    if message.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            ErrorBody::new("INVALID_REQUEST", "message is empty after sanitization"),
        ));
    }

    let req = prepare_request(&state, body.thread_id.as_deref(), message, None).map_err(|e| {
        warn!(error = %e, "chat request preparation failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorBody::new("DATABASE_ERROR", e.to_string()),
        )
    })?;

    Ok(crate::http::stream::pipeline_sse(
        Arc::clone(&state.agent),
        state.pipeline_store(),
        None,
        req,
    ))
}

/// Resolve the thread, apply sticky routing, persist the user turn, and
/// assemble the pipeline request. Shared with the document endpoints, which
/// pass a forced mode instead of routing by content.
pub fn prepare_request(
    state: &AppState,
    thread_id: Option<&str>,
    message: String,
    forced_mode: Option<mizan_core::types::ProcessingMode>,
) -> Result<PipelineRequest, mizan_sessions::StoreError> {
    let thread = state.store.get_or_create_thread(thread_id)?;

    let mode = forced_mode.unwrap_or_else(|| route(&message, thread.processing_mode));
    let complexity = match forced_mode {
        // document endpoints always warrant the full pipeline
        Some(_) => Complexity::FullPipeline,
        None => estimate_complexity(&message),
    };

    state.store.set_processing_mode(&thread.thread_id, mode)?;

    // history is loaded before the current turn is appended — the pipeline
    // adds the current message itself
    let history = if state.config.pipeline.use_checkpointing {
        let prior = state.store.get_history(&thread.thread_id, HISTORY_LIMIT)?;
        state
            .store
            .append_message(&thread.thread_id, "user", &message, None, serde_json::json!({}))?;
        prior
            .iter()
            .map(|m| Message {
                role: if m.role == "assistant" {
                    Role::Assistant
                } else {
                    Role::User
                },
                content: m.content.clone(),
            })
            .collect()
    } else {
        Vec::new()
    };

    info!(
        thread = %thread.thread_id,
        mode = %mode,
        full_pipeline = (complexity == Complexity::FullPipeline),
        "request routed"
    );

    Ok(PipelineRequest {
        thread_id: thread.thread_id,
        message,
        mode,
        complexity,
        history,
    })
}
