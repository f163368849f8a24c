//! Range execution.
//!
//! Solving runs on a blocking thread; the outcome is posted to the range's
//! callback address as a `{result, task}` report. A strategy failure is
//! reported as `{"error": ...}` so the distributor can retire the range.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use thiserror::Error;
use tracing::{error, info, warn};

use routeshard_core::{CompletionReport, StrategyError, TaskRange};

use crate::state::{SolveTicket, WorkerState};

/// Errors that can occur while executing a range.
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("Strategy failed: {0}")]
    Strategy(#[from] StrategyError),

    #[error("Solver thread panicked: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("Callback failed: {0}")]
    Callback(#[from] reqwest::Error),
}

/// Where completion reports go.
#[async_trait]
pub trait ReportSink: Send + Sync {
    async fn deliver(&self, url: &str, report: &CompletionReport) -> Result<(), ExecutorError>;
}

/// Posts reports over HTTP.
pub struct HttpReportSink {
    client: Client,
}

impl HttpReportSink {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ReportSink for HttpReportSink {
    async fn deliver(&self, url: &str, report: &CompletionReport) -> Result<(), ExecutorError> {
        self.client
            .post(url)
            .json(report)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

/// Runs claimed ranges and reports their outcome.
pub struct Executor {
    state: Arc<WorkerState>,
    sink: Arc<dyn ReportSink>,
}

impl Executor {
    pub fn new(state: Arc<WorkerState>, sink: Arc<dyn ReportSink>) -> Self {
        Self { state, sink }
    }

    /// Solve `range`, report it, and release the claim.
    pub async fn execute(&self, ticket: SolveTicket, range: TaskRange) -> Result<(), ExecutorError> {
        let generation = ticket.generation;
        let outcome = self.solve(ticket, &range).await;
        let delivered = self.report(outcome, range).await;
        self.state.finish_solve(generation).await;
        delivered
    }

    async fn solve(
        &self,
        ticket: SolveTicket,
        range: &TaskRange,
    ) -> Result<serde_json::Value, ExecutorError> {
        let start = range.start.clone();
        let end = range.end.clone();
        let loaded = ticket.loaded;

        let result = tokio::task::spawn_blocking(move || {
            loaded.strategy.solve_chunk(&loaded.dataset, &start, &end)
        })
        .await??;
        Ok(result)
    }

    async fn report(
        &self,
        outcome: Result<serde_json::Value, ExecutorError>,
        range: TaskRange,
    ) -> Result<(), ExecutorError> {
        let result = match outcome {
            Ok(result) => {
                info!(start = %range.start, end = %range.end, "Range solved");
                result
            }
            Err(e) => {
                error!(start = %range.start, end = %range.end, error = %e, "Range failed");
                json!({ "error": e.to_string() })
            }
        };

        let url = range.callback_url.clone();
        let report = CompletionReport {
            result,
            task: range,
        };
        if let Err(e) = self.sink.deliver(&url, &report).await {
            warn!(url = %url, range = %report.task, error = %e, "Could not deliver report");
            return Err(e);
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    use std::sync::Mutex;

    use routeshard_core::WorkerStatus;

    use crate::state::tests::loaded;

    /// Keeps every delivered report.
    #[derive(Default)]
    pub(crate) struct RecordingSink {
        pub reports: Mutex<Vec<(String, CompletionReport)>>,
    }

    #[async_trait]
    impl ReportSink for RecordingSink {
        async fn deliver(&self, url: &str, report: &CompletionReport) -> Result<(), ExecutorError> {
            self.reports
                .lock()
                .unwrap()
                .push((url.to_string(), report.clone()));
            Ok(())
        }
    }

    fn range(start: u64, end: u64) -> TaskRange {
        TaskRange::new(start.into(), end.into(), "http://dist/result")
    }

    #[tokio::test]
    async fn test_solve_and_report() {
        let state = Arc::new(WorkerState::new());
        state.install(loaded()).await.unwrap();
        let sink = Arc::new(RecordingSink::default());
        let executor = Executor::new(state.clone(), sink.clone());

        let ticket = state.begin_solve().await.unwrap();
        executor.execute(ticket, range(0, 6)).await.unwrap();

        let reports = sink.reports.lock().unwrap();
        assert_eq!(reports.len(), 1);
        let (url, report) = &reports[0];
        assert_eq!(url, "http://dist/result");
        assert_eq!(report.task, range(0, 6));
        assert_eq!(report.result["totalCost"], 21);
        assert_eq!(state.status().await, WorkerStatus::Free);
    }

    #[tokio::test]
    async fn test_strategy_failure_is_still_reported() {
        let state = Arc::new(WorkerState::new());
        let mut bad = loaded();
        bad.dataset = b"not a matrix".to_vec();
        state.install(bad).await.unwrap();
        let sink = Arc::new(RecordingSink::default());
        let executor = Executor::new(state.clone(), sink.clone());

        let ticket = state.begin_solve().await.unwrap();
        executor.execute(ticket, range(0, 2)).await.unwrap();

        let reports = sink.reports.lock().unwrap();
        assert!(reports[0].1.result.get("error").is_some());
        assert_eq!(state.status().await, WorkerStatus::Free);
    }
}
