//! Response envelope shared by every routeshard HTTP API.

use serde::{Deserialize, Serialize};

/// `{message, statusCode, data}` envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiBody<T = serde_json::Value> {
    pub message: String,
    pub status_code: u16,
    pub data: Option<T>,
}

impl<T> ApiBody<T> {
    /// Envelope carrying a payload.
    pub fn with_data(message: impl Into<String>, status_code: u16, data: T) -> Self {
        Self {
            message: message.into(),
            status_code,
            data: Some(data),
        }
    }

    /// Envelope with `data: null`.
    pub fn empty(message: impl Into<String>, status_code: u16) -> Self {
        Self {
            message: message.into(),
            status_code,
            data: None,
        }
    }
}
