//! HTTP response helpers.

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

use routeshard_core::ApiBody;

/// `200 OK` envelope with a payload.
pub fn ok<T: Serialize>(message: &str, data: T) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(ApiBody::with_data(message, StatusCode::OK.as_u16(), data)),
    )
}

/// `200 OK` envelope with `data: null`.
pub fn ack(message: &str) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(ApiBody::<()>::empty(message, StatusCode::OK.as_u16())),
    )
}
