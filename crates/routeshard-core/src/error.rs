//! Core domain errors.

use thiserror::Error;

/// Core domain errors for routeshard.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A search-space index could not be parsed.
    #[error("Invalid space index: {0}")]
    InvalidIndex(String),

    /// A worker status string is not one of the known states.
    #[error("Unknown worker status: {0}")]
    UnknownStatus(String),

    /// A task range with `start > end`.
    #[error("Invalid task range: {start}..{end}")]
    InvalidRange { start: String, end: String },

    /// Manifest could not be read or parsed.
    #[error("Invalid manifest: {0}")]
    InvalidManifest(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}
