//! Completion callbacks and job termination.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use routeshard_core::{CombineOutcome, CompletionReport, JobId};

use crate::scheduler::Scheduler;

/// Completion errors.
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("Malformed completion report: {0}")]
    Malformed(String),
}

/// What a completion callback did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionOutcome {
    /// No job was running; the report was dropped.
    NoActiveJob,
    /// The report was folded into the running job.
    Recorded {
        /// The range was still pending (false for duplicates).
        known: bool,
        /// The result beat the previous best.
        improved: bool,
    },
    /// The report closed the job.
    JobFinished { job_id: JobId, reset_workers: usize },
}

impl Scheduler {
    /// Handle a worker's completion callback.
    ///
    /// The job finishes when the reported range ends at the final boundary.
    /// Reports arriving with no active job are acknowledged and ignored, so
    /// late callbacks never restart or re-finish a job.
    pub async fn handle_completion(
        &self,
        body: serde_json::Value,
    ) -> Result<CompletionOutcome, CompletionError> {
        let mut current = self.job.lock().await;
        let Some(job) = current.as_ref() else {
            debug!("Completion received with no active job");
            return Ok(CompletionOutcome::NoActiveJob);
        };

        let report: CompletionReport =
            serde_json::from_value(body).map_err(|e| CompletionError::Malformed(e.to_string()))?;
        report
            .task
            .validate()
            .map_err(|e| CompletionError::Malformed(e.to_string()))?;

        let known = self.partitioner.lock().await.complete_task(&report.task);
        if known {
            self.stats.completed_ranges.fetch_add(1, Ordering::Relaxed);
        } else {
            debug!(range = %report.task, "Completion for a range that is not pending");
        }

        // The combiner may persist to disk, so it runs on the blocking pool.
        let combiner = Arc::clone(&self.combiner);
        let result = report.result.clone();
        let improved = match tokio::task::spawn_blocking(move || combiner.combine(&result)).await {
            Ok(Ok(outcome)) => outcome == CombineOutcome::Improved,
            Ok(Err(e)) => {
                warn!(range = %report.task, error = %e, "Result rejected by combiner");
                false
            }
            Err(e) => {
                warn!(range = %report.task, error = %e, "Combiner task failed");
                false
            }
        };

        if report.task.end != job.final_boundary {
            return Ok(CompletionOutcome::Recorded { known, improved });
        }

        let job_id = job.id.clone();
        *current = None;
        self.partitioner.lock().await.reset();
        drop(current);

        self.stats.jobs_finished.fetch_add(1, Ordering::Relaxed);
        info!(job_id = %job_id, best = ?self.combiner.best(), "Job finished");

        let reset_workers = self.reset_workers().await;
        Ok(CompletionOutcome::JobFinished {
            job_id,
            reset_workers,
        })
    }

    /// Best-effort reset of every known worker. Returns how many accepted.
    async fn reset_workers(&self) -> usize {
        let workers = match self.source.live_workers().await {
            Ok(workers) => workers,
            Err(e) => {
                warn!(error = %e, "Could not list workers to reset");
                return 0;
            }
        };

        let mut reset = 0;
        for worker in &workers {
            match self.gateway.reset(&worker.addr).await {
                Ok(()) => reset += 1,
                Err(e) => warn!(worker = %worker.addr, error = %e, "Worker reset failed"),
            }
        }
        info!(reset, total = workers.len(), "Workers reset");
        reset
    }
}
