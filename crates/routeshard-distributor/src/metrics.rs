//! Prometheus metrics collection and formatting.

use std::fmt::Write;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use crate::state::AppState;

/// Collect all metrics from AppState and format as Prometheus text.
pub async fn collect_metrics(state: &Arc<AppState>) -> String {
    let mut output = String::new();

    collect_job_metrics(state, &mut output).await;
    collect_dispatch_metrics(state, &mut output);

    output
}

/// Job progress gauges. All zero while idle.
async fn collect_job_metrics(state: &Arc<AppState>, output: &mut String) {
    let status = state.scheduler.status().await;
    let (active, boundary, cursor, pending, assigned) = match &status {
        Some(s) => (
            1,
            s.final_boundary.to_f64(),
            s.cursor.to_f64(),
            s.pending,
            s.assigned,
        ),
        None => (0, 0.0, 0.0, 0, 0),
    };

    gauge(output, "routeshard_job_active", "Whether a job is running", active);
    gauge(
        output,
        "routeshard_job_final_boundary",
        "Size of the active job's search space",
        boundary,
    );
    gauge(
        output,
        "routeshard_job_cursor",
        "Positions of the search space handed to the partitioner so far",
        cursor,
    );
    gauge(
        output,
        "routeshard_ranges_pending",
        "Generated ranges not yet completed",
        pending,
    );
    gauge(
        output,
        "routeshard_ranges_assigned",
        "Pending ranges currently held by a worker",
        assigned,
    );
}

/// Dispatch counters since process start.
fn collect_dispatch_metrics(state: &Arc<AppState>, output: &mut String) {
    let stats = state.scheduler.stats();

    counter(
        output,
        "routeshard_ranges_dispatched_total",
        "Ranges accepted by a worker",
        stats.dispatched.load(Ordering::Relaxed),
    );
    counter(
        output,
        "routeshard_ranges_completed_total",
        "Pending ranges closed by a completion callback",
        stats.completed_ranges.load(Ordering::Relaxed),
    );
    counter(
        output,
        "routeshard_dispatch_failures_total",
        "Ranges a worker failed to accept",
        stats.dispatch_failures.load(Ordering::Relaxed),
    );
    counter(
        output,
        "routeshard_init_failures_total",
        "Worker init requests that failed",
        stats.init_failures.load(Ordering::Relaxed),
    );
    counter(
        output,
        "routeshard_jobs_finished_total",
        "Jobs that reached their final boundary",
        stats.jobs_finished.load(Ordering::Relaxed),
    );
}

fn gauge(output: &mut String, name: &str, help: &str, value: impl std::fmt::Display) {
    writeln!(output, "# HELP {name} {help}").ok();
    writeln!(output, "# TYPE {name} gauge").ok();
    writeln!(output, "{name} {value}").ok();
}

fn counter(output: &mut String, name: &str, help: &str, value: u64) {
    writeln!(output, "# HELP {name} {help}").ok();
    writeln!(output, "# TYPE {name} counter").ok();
    writeln!(output, "{name} {value}").ok();
}
