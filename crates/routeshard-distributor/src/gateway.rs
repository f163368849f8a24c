//! Outbound calls: the manager's worker list and the worker control API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use thiserror::Error;
use tracing::debug;

use routeshard_core::{ApiBody, TaskRange, Worker, WorkerAddr};

use crate::job::InitBundle;

/// Gateway errors.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{url} answered {status}: {message}")]
    Rejected {
        url: String,
        status: u16,
        message: String,
    },
}

/// Source of the current live worker set.
#[async_trait]
pub trait WorkerSource: Send + Sync {
    async fn live_workers(&self) -> Result<Vec<Worker>, GatewayError>;
}

/// Control surface of a single worker.
#[async_trait]
pub trait WorkerGateway: Send + Sync {
    /// Send the artifact, dataset and manifest.
    async fn init(&self, worker: &WorkerAddr, bundle: &InitBundle) -> Result<(), GatewayError>;

    /// Hand a range to the worker.
    async fn solve(&self, worker: &WorkerAddr, range: &TaskRange) -> Result<(), GatewayError>;

    /// Return the worker to UNINITIALIZED.
    async fn reset(&self, worker: &WorkerAddr) -> Result<(), GatewayError>;
}

/// Build a client with a request deadline.
pub fn build_client(timeout: Duration) -> Result<Client, GatewayError> {
    Ok(Client::builder().timeout(timeout).build()?)
}

/// Reads the worker list from the manager.
pub struct ManagerClient {
    client: Client,
    workers_url: String,
}

impl ManagerClient {
    pub fn new(client: Client, manager_url: &str) -> Self {
        Self {
            client,
            workers_url: format!("{}/get-workers", manager_url.trim_end_matches('/')),
        }
    }
}

#[async_trait]
impl WorkerSource for ManagerClient {
    async fn live_workers(&self) -> Result<Vec<Worker>, GatewayError> {
        let response = self.client.get(&self.workers_url).send().await?;
        let body: ApiBody<Vec<Worker>> = ensure_success(response).await?.json().await?;
        Ok(body.data.unwrap_or_default())
    }
}

/// Talks to workers over their HTTP API.
pub struct HttpWorkerGateway {
    client: Client,
}

impl HttpWorkerGateway {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl WorkerGateway for HttpWorkerGateway {
    async fn init(&self, worker: &WorkerAddr, bundle: &InitBundle) -> Result<(), GatewayError> {
        let form = Form::new()
            .part(
                "artifact",
                Part::bytes(bundle.artifact.clone()).file_name(bundle.artifact_name.clone()),
            )
            .part(
                "dataset",
                Part::bytes(bundle.dataset.clone()).file_name(bundle.dataset_name.clone()),
            )
            .part(
                "manifest",
                Part::bytes(bundle.manifest.clone()).file_name("manifest.json"),
            );

        let response = self
            .client
            .post(worker.init_url())
            .multipart(form)
            .send()
            .await?;
        ensure_success(response).await?;
        debug!(worker = %worker, "Init accepted");
        Ok(())
    }

    async fn solve(&self, worker: &WorkerAddr, range: &TaskRange) -> Result<(), GatewayError> {
        let response = self
            .client
            .post(worker.solve_url())
            .json(range)
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(())
    }

    async fn reset(&self, worker: &WorkerAddr) -> Result<(), GatewayError> {
        let response = self.client.get(worker.reset_url()).send().await?;
        ensure_success(response).await?;
        Ok(())
    }
}

/// Turn a non-2xx answer into [`GatewayError::Rejected`], keeping the
/// envelope message when there is one.
async fn ensure_success(response: Response) -> Result<Response, GatewayError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let url = response.url().to_string();
    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiBody>(&text)
        .map(|body| body.message)
        .unwrap_or(text);

    Err(GatewayError::Rejected {
        url,
        status: status.as_u16(),
        message,
    })
}
