//! Completion callback handler.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::Response, Json};
use tracing::warn;

use crate::completion::CompletionOutcome;
use crate::http::responses::message;
use crate::state::AppState;

/// Receive a worker's `{result, task}` report.
pub async fn receive_result(
    State(state): State<Arc<AppState>>,
    Json(body): Json<serde_json::Value>,
) -> Response {
    match state.scheduler.handle_completion(body).await {
        Ok(CompletionOutcome::NoActiveJob) => message(StatusCode::OK, "No active job"),
        Ok(CompletionOutcome::Recorded { .. }) => message(StatusCode::OK, "Result recorded"),
        Ok(CompletionOutcome::JobFinished { .. }) => message(StatusCode::OK, "Job finished"),
        Err(e) => {
            warn!(error = %e, "Discarding completion report");
            message(StatusCode::BAD_REQUEST, &e.to_string())
        }
    }
}
