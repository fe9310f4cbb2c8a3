//! Task resource lookup — GET /v1/tasks/{id}
//!
//! Unknown ids return a typed 404 body, never a bare error.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use tracing::warn;

use mizan_sessions::{StoreError, TaskRecord};

use crate::app::AppState;
use crate::http::ErrorBody;

pub async fn get_task_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<TaskRecord>, (StatusCode, Json<ErrorBody>)> {
    match state.store.get_task(&id) {
        Ok(task) => Ok(Json(task)),
        Err(StoreError::TaskNotFound { task_id }) => Err((
            StatusCode::NOT_FOUND,
            ErrorBody::new("NOT_FOUND", format!("task {task_id} does not exist")),
        )),
        Err(e) => {
            warn!(task = %id, error = %e, "task lookup failed");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody::new("DATABASE_ERROR", e.to_string()),
            ))
        }
    }
}
