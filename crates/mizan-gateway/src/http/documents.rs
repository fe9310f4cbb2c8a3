//! Document endpoints — POST /v1/documents/generate and /analyze.
//!
//! Both validate the request schema synchronously (a malformed body gets a
//! structured 400 and no stream is opened), create a task record, force the
//! contract-analysis mode, and stream the full pipeline as SSE. The task is
//! completed or failed as the stream finishes.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Deserialize;
use std::sync::Arc;
use tracing::warn;

use mizan_core::types::{Priority, ProcessingMode};

use mizan_agent::sanitize::sanitize;

use crate::app::AppState;
use crate::http::chat::prepare_request;
use crate::http::ErrorBody;

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub document_type: String,
    pub title: String,
    #[serde(default)]
    pub parameters: serde_json::Value,
    pub case_id: Option<i64>,
    #[serde(default)]
    pub priority: Priority,
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub document_content: String,
    pub analysis_type: String,
    #[serde(default)]
    pub parameters: Option<serde_json::Value>,
    pub case_id: Option<i64>,
}

/// POST /v1/documents/generate — draft a new document, streaming frames.
pub async fn generate_handler(
    State(state): State<Arc<AppState>>,
    Json(raw): Json<serde_json::Value>,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorBody>)> {
    let req: GenerateRequest = parse_schema(raw.clone())?;
    if req.document_type.trim().is_empty() || req.title.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            ErrorBody::new("INVALID_REQUEST", "document_type and title are required"),
        ));
    }

    // synthesize the drafting instruction consumed by the pipeline
    let instruction = sanitize(
        &format!(
            "Draft a {} titled \"{}\". Parameters: {}. Priority: {}.",
            req.document_type, req.title, req.parameters, req.priority
        ),
        state.config.pipeline.max_input_chars,
    );

    let task = state
        .store
        .create_task("document_generation", raw)
        .map_err(internal)?;

    let pipeline_req = prepare_request(
        &state,
        None,
        instruction,
        Some(ProcessingMode::ContractAnalysis),
    )
    .map_err(internal)?;

    Ok(crate::http::stream::pipeline_sse(
        Arc::clone(&state.agent),
        state.pipeline_store(),
        Some((Arc::clone(&state.store), task.id)),
        pipeline_req,
    ))
}

/// POST /v1/documents/analyze — analyse provided document text, streaming
/// frames under the same protocol.
pub async fn analyze_handler(
    State(state): State<Arc<AppState>>,
    Json(raw): Json<serde_json::Value>,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorBody>)> {
    let req: AnalyzeRequest = parse_schema(raw.clone())?;
    if req.document_content.trim().is_empty() || req.analysis_type.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            ErrorBody::new(
                "INVALID_REQUEST",
                "document_content and analysis_type are required",
            ),
        ));
    }

    let instruction = sanitize(
        &format!(
            "Perform a {} analysis of the following document:\n{}",
            req.analysis_type, req.document_content
        ),
        state.config.pipeline.max_input_chars,
    );

    let task = state
        .store
        .create_task("contract_analysis", raw)
        .map_err(internal)?;

    let pipeline_req = prepare_request(
        &state,
        None,
        instruction,
        Some(ProcessingMode::ContractAnalysis),
    )
    .map_err(internal)?;

    Ok(crate::http::stream::pipeline_sse(
        Arc::clone(&state.agent),
        state.pipeline_store(),
        Some((Arc::clone(&state.store), task.id)),
        pipeline_req,
    ))
}

/// Decode a request schema, mapping serde failures to a structured 400.
fn parse_schema<T: serde::de::DeserializeOwned>(
    raw: serde_json::Value,
) -> Result<T, (StatusCode, Json<ErrorBody>)> {
    serde_json::from_value(raw).map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            ErrorBody::new("INVALID_REQUEST", e.to_string()),
        )
    })
}

fn internal(e: mizan_sessions::StoreError) -> (StatusCode, Json<ErrorBody>) {
    warn!(error = %e, "document request failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        ErrorBody::new("DATABASE_ERROR", e.to_string()),
    )
}
