//! Prometheus metrics collection and formatting.
//!
//! This module provides metrics in Prometheus text exposition format.

use std::fmt::Write;
use std::sync::Arc;

use routeshard_core::WorkerStatus;

use crate::state::AppState;

/// Collect all metrics from AppState and format as Prometheus text.
pub async fn collect_metrics(state: &Arc<AppState>) -> String {
    let mut output = String::new();
    collect_worker_metrics(state, &mut output).await;
    output
}

/// Collect worker metrics by status.
async fn collect_worker_metrics(state: &Arc<AppState>, output: &mut String) {
    let workers = state.registry.snapshot().await;

    let mut uninitialized = 0u64;
    let mut free = 0u64;
    let mut working = 0u64;

    for worker in &workers {
        match worker.worker_status {
            WorkerStatus::Uninitialized => uninitialized += 1,
            WorkerStatus::Free => free += 1,
            WorkerStatus::Working => working += 1,
        }
    }

    writeln!(
        output,
        "# HELP routeshard_workers_registered Number of registered workers by status"
    )
    .ok();
    writeln!(output, "# TYPE routeshard_workers_registered gauge").ok();
    writeln!(
        output,
        "routeshard_workers_registered{{status=\"uninitialized\"}} {uninitialized}"
    )
    .ok();
    writeln!(output, "routeshard_workers_registered{{status=\"free\"}} {free}").ok();
    writeln!(
        output,
        "routeshard_workers_registered{{status=\"working\"}} {working}"
    )
    .ok();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::WorkerRegistry;
    use routeshard_core::WorkerAddr;

    #[tokio::test]
    async fn test_collect_metrics_counts_by_status() {
        let registry = Arc::new(WorkerRegistry::new());
        registry.register(WorkerAddr::new("a", 1)).await;
        registry.register(WorkerAddr::new("b", 1)).await;
        registry
            .update_status(&WorkerAddr::new("b", 1), WorkerStatus::Free)
            .await;

        let output = collect_metrics(&AppState::new(registry)).await;

        assert!(output.contains("routeshard_workers_registered{status=\"uninitialized\"} 1"));
        assert!(output.contains("routeshard_workers_registered{status=\"free\"} 1"));
        assert!(output.contains("routeshard_workers_registered{status=\"working\"} 0"));
    }
}
