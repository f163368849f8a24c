//! HTTP server for the manager.
//!
//! Provides endpoints for:
//! - Worker registration (`/worker-register`, `/worker-leave`)
//! - Live worker list (`/get-workers`)
//! - Health check (`/health`)
//! - Prometheus metrics (`/metrics`)

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

mod handlers;
pub mod responses;

/// Create the HTTP router.
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Registry routes
        .route("/worker-register", post(handlers::register_worker))
        .route("/worker-leave", post(handlers::leave_worker))
        .route("/get-workers", get(handlers::list_workers))
        // Observability routes
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use routeshard_core::{ApiBody, Worker, WorkerStatus};

    use crate::registry::WorkerRegistry;

    fn make_app_state() -> Arc<AppState> {
        AppState::new(Arc::new(WorkerRegistry::new()))
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap()
    }

    #[tokio::test]
    async fn register_then_list() {
        let state = make_app_state();

        let response = create_router(state.clone())
            .oneshot(post_json(
                "/worker-register",
                serde_json::json!({"host": "10.0.0.5", "port": 8085}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = create_router(state)
            .oneshot(
                Request::builder()
                    .uri("/get-workers")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: ApiBody<Vec<Worker>> = serde_json::from_slice(&bytes).unwrap();
        let workers = body.data.unwrap();
        assert_eq!(workers.len(), 1);
        assert_eq!(workers[0].addr.host, "10.0.0.5");
        assert_eq!(workers[0].worker_status, WorkerStatus::Uninitialized);
    }

    #[tokio::test]
    async fn leave_removes_worker() {
        let state = make_app_state();
        let worker = serde_json::json!({"host": "10.0.0.5", "port": 8085});

        create_router(state.clone())
            .oneshot(post_json("/worker-register", worker.clone()))
            .await
            .unwrap();
        let response = create_router(state.clone())
            .oneshot(post_json("/worker-leave", worker))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(state.registry.is_empty().await);
    }

    #[tokio::test]
    async fn malformed_registration_is_rejected() {
        let response = create_router(make_app_state())
            .oneshot(post_json("/worker-register", serde_json::json!({"host": "x"})))
            .await
            .unwrap();

        assert!(response.status().is_client_error());
    }

    #[tokio::test]
    async fn health_endpoint() {
        let response = create_router(make_app_state())
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }
}
