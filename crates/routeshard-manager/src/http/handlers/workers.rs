//! Worker registration handlers.

use std::sync::Arc;

use axum::{extract::State, response::IntoResponse, Json};

use routeshard_core::WorkerAddr;

use crate::http::responses::{ack, ok};
use crate::state::AppState;

/// Register a worker. Registering twice is harmless.
pub async fn register_worker(
    State(state): State<Arc<AppState>>,
    Json(addr): Json<WorkerAddr>,
) -> impl IntoResponse {
    state.registry.register(addr).await;
    ack("Worker registered")
}

/// Remove a worker that is shutting down.
pub async fn leave_worker(
    State(state): State<Arc<AppState>>,
    Json(addr): Json<WorkerAddr>,
) -> impl IntoResponse {
    state.registry.deregister(&addr).await;
    ack("Worker removed")
}

/// List live workers with their last reported status.
pub async fn list_workers(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let workers = state.registry.snapshot().await;
    ok("Active workers", workers)
}
