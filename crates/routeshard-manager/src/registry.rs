//! Live worker set.

use std::collections::HashMap;

use tokio::sync::RwLock;
use tracing::{info, warn};

use routeshard_core::{Worker, WorkerAddr, WorkerStatus};

/// Authoritative set of live workers and their last reported status.
#[derive(Debug, Default)]
pub struct WorkerRegistry {
    workers: RwLock<HashMap<WorkerAddr, WorkerStatus>>,
}

impl WorkerRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a worker. Registering a known worker leaves its status alone.
    ///
    /// Returns true if the worker was not registered before.
    pub async fn register(&self, addr: WorkerAddr) -> bool {
        let mut workers = self.workers.write().await;
        if workers.contains_key(&addr) {
            return false;
        }
        info!(worker = %addr, "Worker registered");
        workers.insert(addr, WorkerStatus::Uninitialized);
        true
    }

    /// Removes a worker that is leaving on its own.
    ///
    /// Returns true if the worker was registered.
    pub async fn deregister(&self, addr: &WorkerAddr) -> bool {
        let removed = self.workers.write().await.remove(addr).is_some();
        if removed {
            info!(worker = %addr, "Worker left");
        }
        removed
    }

    /// Removes a worker whose health probe failed.
    pub async fn evict(&self, addr: &WorkerAddr) -> bool {
        let removed = self.workers.write().await.remove(addr).is_some();
        if removed {
            warn!(worker = %addr, "Worker evicted");
        }
        removed
    }

    /// Records a status reported by the worker. Unknown workers are ignored
    /// so a late probe answer cannot resurrect an evicted worker.
    pub async fn update_status(&self, addr: &WorkerAddr, status: WorkerStatus) -> bool {
        match self.workers.write().await.get_mut(addr) {
            Some(current) => {
                *current = status;
                true
            }
            None => false,
        }
    }

    /// Copy of the live set, ordered by address.
    pub async fn snapshot(&self) -> Vec<Worker> {
        let workers = self.workers.read().await;
        let mut snapshot: Vec<Worker> = workers
            .iter()
            .map(|(addr, status)| Worker::new(addr.clone()).with_status(*status))
            .collect();
        snapshot.sort_by(|a, b| a.addr.cmp(&b.addr));
        snapshot
    }

    /// Get the number of registered workers.
    pub async fn len(&self) -> usize {
        self.workers.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.workers.read().await.is_empty()
    }
}
