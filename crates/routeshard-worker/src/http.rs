//! Worker HTTP API: `check-state`, `init`, `solve`, `reset`, `health`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use routeshard_core::{ApiBody, Manifest, StrategyRegistry, TaskRange};

use crate::executor::Executor;
use crate::state::{Loaded, WorkerState};

/// Shared application state.
pub struct AppState {
    pub worker: Arc<WorkerState>,
    pub executor: Arc<Executor>,
    pub strategies: StrategyRegistry,
    pub work_dir: PathBuf,
}

/// Create the HTTP router.
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/check-state", get(check_state))
        .route("/init", post(init))
        .route("/solve", post(solve))
        .route("/reset", get(reset))
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn envelope<T: serde::Serialize>(status: StatusCode, message: &str, data: Option<T>) -> Response {
    let body = ApiBody {
        message: message.to_string(),
        status_code: status.as_u16(),
        data,
    };
    (status, Json(body)).into_response()
}

fn message(status: StatusCode, message: &str) -> Response {
    envelope::<()>(status, message, None)
}

async fn check_state(State(state): State<Arc<AppState>>) -> Response {
    let status = state.worker.status().await;
    envelope(StatusCode::OK, "Worker status", Some(status))
}

/// Parts of an init upload.
#[derive(Default)]
struct InitParts {
    artifact: Option<Vec<u8>>,
    dataset: Option<Vec<u8>>,
    manifest: Option<Vec<u8>>,
}

async fn read_parts(mut multipart: Multipart) -> Result<InitParts, String> {
    let mut parts = InitParts::default();
    while let Some(field) = multipart.next_field().await.map_err(|e| e.to_string())? {
        let name = field.name().unwrap_or_default().to_string();
        let bytes = field.bytes().await.map_err(|e| e.to_string())?.to_vec();
        match name.as_str() {
            "artifact" => parts.artifact = Some(bytes),
            "dataset" => parts.dataset = Some(bytes),
            "manifest" => parts.manifest = Some(bytes),
            other => warn!(field = %other, "Ignoring unknown init field"),
        }
    }
    Ok(parts)
}

async fn init(State(state): State<Arc<AppState>>, multipart: Multipart) -> Response {
    let parts = match read_parts(multipart).await {
        Ok(parts) => parts,
        Err(e) => return message(StatusCode::BAD_REQUEST, &e),
    };
    let (Some(artifact), Some(dataset), Some(manifest_bytes)) =
        (parts.artifact, parts.dataset, parts.manifest)
    else {
        return message(
            StatusCode::BAD_REQUEST,
            "Init requires artifact, dataset and manifest",
        );
    };

    let manifest = match Manifest::from_slice(&manifest_bytes) {
        Ok(manifest) => manifest,
        Err(e) => return message(StatusCode::BAD_REQUEST, &e.to_string()),
    };
    let strategy = match state.strategies.resolve(&manifest.strategy) {
        Ok(strategy) => strategy,
        Err(e) => return message(StatusCode::BAD_REQUEST, &e.to_string()),
    };
    if let Err(e) = strategy.space_size(&dataset) {
        return message(StatusCode::UNPROCESSABLE_ENTITY, &e.to_string());
    }

    if let Err(e) = store(&state.work_dir, &artifact, &dataset, &manifest_bytes).await {
        warn!(dir = %state.work_dir.display(), error = %e, "Could not store init files");
        return message(StatusCode::INTERNAL_SERVER_ERROR, "Could not store init files");
    }

    let loaded = Loaded {
        manifest,
        strategy,
        dataset,
    };
    match state.worker.install(loaded).await {
        Ok(()) => message(StatusCode::OK, "Initialized"),
        Err(status) => message(
            StatusCode::CONFLICT,
            &format!("Cannot initialize while {status}"),
        ),
    }
}

/// Files `init` writes into the work dir, in part order.
const INIT_FILES: [&str; 3] = ["artifact.bin", "dataset.json", "manifest.json"];

async fn store(
    dir: &Path,
    artifact: &[u8],
    dataset: &[u8],
    manifest: &[u8],
) -> std::io::Result<()> {
    tokio::fs::create_dir_all(dir).await?;
    for (name, bytes) in INIT_FILES.iter().zip([artifact, dataset, manifest]) {
        tokio::fs::write(dir.join(name), bytes).await?;
    }
    Ok(())
}

/// Remove only what `store` wrote; the work dir itself stays.
async fn clear(dir: &Path) {
    for name in INIT_FILES {
        let path = dir.join(name);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %path.display(), error = %e, "Could not remove init file"),
        }
    }
}

async fn solve(State(state): State<Arc<AppState>>, Json(range): Json<TaskRange>) -> Response {
    if let Err(e) = range.validate() {
        return message(StatusCode::BAD_REQUEST, &e.to_string());
    }

    let ticket = match state.worker.begin_solve().await {
        Ok(ticket) => ticket,
        Err(status) => {
            return message(StatusCode::CONFLICT, &format!("Worker is {status}"));
        }
    };

    info!(start = %range.start, end = %range.end, "Range accepted");
    let executor = state.executor.clone();
    tokio::spawn(async move {
        let _ = executor.execute(ticket, range).await;
    });

    message(StatusCode::OK, "Task accepted")
}

async fn reset(State(state): State<Arc<AppState>>) -> Response {
    state.worker.reset().await;
    clear(&state.work_dir).await;
    info!("Worker reset");
    message(StatusCode::OK, "Reset")
}

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}
