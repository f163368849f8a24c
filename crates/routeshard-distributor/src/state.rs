//! Shared application state.

use std::sync::Arc;

use crate::scheduler::Scheduler;

/// Shared application state.
pub struct AppState {
    /// Job lifecycle, partitioner and dispatch.
    pub scheduler: Arc<Scheduler>,
}

impl AppState {
    /// Create a new AppState wrapped in Arc.
    pub fn new(scheduler: Arc<Scheduler>) -> Arc<Self> {
        Arc::new(Self { scheduler })
    }
}
