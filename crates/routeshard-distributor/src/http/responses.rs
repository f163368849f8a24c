//! HTTP request and response types.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use routeshard_core::ApiBody;

/// Query of `GET /start`.
#[derive(Debug, Deserialize)]
pub struct StartParams {
    #[serde(rename = "zipName")]
    pub zip_name: String,
}

/// Payload of a successful `GET /start`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartResponse {
    pub job_id: String,
    pub strategy: String,
    pub final_boundary: String,
}

/// `{message, statusCode, data}` with the status mirrored in the envelope.
pub fn envelope<T: Serialize>(status: StatusCode, message: &str, data: Option<T>) -> Response {
    let body = ApiBody {
        message: message.to_string(),
        status_code: status.as_u16(),
        data,
    };
    (status, Json(body)).into_response()
}

/// Envelope with `data: null`.
pub fn message(status: StatusCode, message: &str) -> Response {
    envelope::<()>(status, message, None)
}
