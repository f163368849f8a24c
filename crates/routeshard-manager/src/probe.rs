//! Worker state probes.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use routeshard_core::{ApiBody, WorkerAddr, WorkerStatus};

/// Probe errors. Any of them gets the worker evicted.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// Connection, HTTP status or decoding failure.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The worker answered without a status.
    #[error("worker {0} reported no status")]
    MissingStatus(WorkerAddr),
}

/// Asks a worker for its current status.
#[async_trait]
pub trait StateProbe: Send + Sync {
    async fn check_state(&self, worker: &WorkerAddr) -> Result<WorkerStatus, ProbeError>;
}

/// Probe over the worker's `check-state` endpoint.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    client: reqwest::Client,
}

impl HttpProbe {
    /// Create a probe whose requests give up after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, ProbeError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl StateProbe for HttpProbe {
    async fn check_state(&self, worker: &WorkerAddr) -> Result<WorkerStatus, ProbeError> {
        let url = worker.check_state_url();
        debug!(url = %url, "Probing worker");

        let body: ApiBody<WorkerStatus> = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        body.data
            .ok_or_else(|| ProbeError::MissingStatus(worker.clone()))
    }
}
