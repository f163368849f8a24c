//! Worker lifecycle state.
//!
//! UNINITIALIZED until an init installs a strategy and dataset, then FREE,
//! WORKING while a range is solved, and back to UNINITIALIZED on reset. A
//! reset bumps the generation so a solve that outlives it cannot flip the
//! worker back to FREE.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::info;

use routeshard_core::{Manifest, SearchStrategy, WorkerStatus};

/// What an init installed.
pub struct Loaded {
    pub manifest: Manifest,
    pub strategy: Arc<dyn SearchStrategy>,
    pub dataset: Vec<u8>,
}

struct Inner {
    status: WorkerStatus,
    loaded: Option<Arc<Loaded>>,
    generation: u64,
}

/// A claimed solve slot.
pub struct SolveTicket {
    pub loaded: Arc<Loaded>,
    pub generation: u64,
}

/// Shared worker state.
pub struct WorkerState {
    inner: RwLock<Inner>,
}

impl WorkerState {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                status: WorkerStatus::Uninitialized,
                loaded: None,
                generation: 0,
            }),
        }
    }

    pub async fn status(&self) -> WorkerStatus {
        self.inner.read().await.status
    }

    /// Install a strategy and dataset and become FREE.
    ///
    /// Refused while a range is being solved; returns the current status.
    pub async fn install(&self, loaded: Loaded) -> Result<(), WorkerStatus> {
        let mut inner = self.inner.write().await;
        if inner.status == WorkerStatus::Working {
            return Err(inner.status);
        }
        info!(strategy = %loaded.manifest.strategy, "Worker initialized");
        inner.loaded = Some(Arc::new(loaded));
        inner.status = WorkerStatus::Free;
        Ok(())
    }

    /// Claim the worker for one range. Only a FREE worker can be claimed.
    pub async fn begin_solve(&self) -> Result<SolveTicket, WorkerStatus> {
        let mut inner = self.inner.write().await;
        match (&inner.status, &inner.loaded) {
            (WorkerStatus::Free, Some(loaded)) => {
                let ticket = SolveTicket {
                    loaded: loaded.clone(),
                    generation: inner.generation,
                };
                inner.status = WorkerStatus::Working;
                Ok(ticket)
            }
            _ => Err(inner.status),
        }
    }

    /// Release a claim. Ignored if a reset happened since it was taken.
    pub async fn finish_solve(&self, generation: u64) {
        let mut inner = self.inner.write().await;
        if inner.generation == generation && inner.status == WorkerStatus::Working {
            inner.status = WorkerStatus::Free;
        }
    }

    /// Drop everything and return to UNINITIALIZED.
    pub async fn reset(&self) {
        let mut inner = self.inner.write().await;
        inner.status = WorkerStatus::Uninitialized;
        inner.loaded = None;
        inner.generation += 1;
    }
}

impl Default for WorkerState {
    fn default() -> Self {
        Self::new()
    }
}
