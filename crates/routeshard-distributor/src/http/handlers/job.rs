//! Job start and status handlers.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Response,
};
use tracing::{info, warn};

use routeshard_core::StrategyError;

use crate::http::responses::{envelope, message, StartParams, StartResponse};
use crate::job::JobError;
use crate::state::AppState;

/// Start a job over a dataset in the upload directory.
pub async fn start_job(
    State(state): State<Arc<AppState>>,
    Query(params): Query<StartParams>,
) -> Response {
    match state.scheduler.start_job(&params.zip_name).await {
        Ok(job) => {
            info!(job_id = %job.id, dataset = %params.zip_name, "Job accepted");
            envelope(
                StatusCode::OK,
                "Job started",
                Some(StartResponse {
                    job_id: job.id.to_string(),
                    strategy: job.strategy,
                    final_boundary: job.final_boundary.to_string(),
                }),
            )
        }
        Err(e) => {
            let status = error_status(&e);
            warn!(dataset = %params.zip_name, error = %e, status = status.as_u16(), "Job rejected");
            message(status, &e.to_string())
        }
    }
}

/// Progress of the active job.
pub async fn job_status(State(state): State<Arc<AppState>>) -> Response {
    match state.scheduler.status().await {
        Some(status) => envelope(StatusCode::OK, "Job running", Some(status)),
        None => message(StatusCode::OK, "No active job"),
    }
}

fn error_status(e: &JobError) -> StatusCode {
    match e {
        JobError::AlreadyActive(_) => StatusCode::CONFLICT,
        JobError::DatasetNotFound(_)
        | JobError::ArtifactNotFound(_)
        | JobError::ManifestNotFound(_) => StatusCode::NOT_FOUND,
        JobError::Manifest(_) | JobError::Strategy(StrategyError::UnknownStrategy(_)) => {
            StatusCode::BAD_REQUEST
        }
        JobError::Strategy(StrategyError::Io(_)) | JobError::Io(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        JobError::Strategy(_) | JobError::EmptySpace(_) => StatusCode::UNPROCESSABLE_ENTITY,
    }
}
