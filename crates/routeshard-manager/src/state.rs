//! Shared application state.

use std::sync::Arc;

use crate::registry::WorkerRegistry;

/// Shared application state.
pub struct AppState {
    /// Live workers.
    pub registry: Arc<WorkerRegistry>,
}

impl AppState {
    /// Create a new AppState wrapped in Arc.
    pub fn new(registry: Arc<WorkerRegistry>) -> Arc<Self> {
        Arc::new(Self { registry })
    }
}
