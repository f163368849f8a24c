//! Job lifecycle and the periodic dispatch tick.
//!
//! Each tick pulls the live worker set, initializes UNINITIALIZED workers,
//! hands one range to every FREE worker, and finally returns ranges held by
//! vanished workers to the pool. A failing worker never aborts the tick.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use routeshard_core::{JobId, ResultCombiner, StrategyRegistry, WorkerAddr, WorkerStatus};

use crate::config::Config;
use crate::gateway::{GatewayError, WorkerGateway, WorkerSource};
use crate::job::{Job, JobError, JobStatus};
use crate::partitioner::Partitioner;

/// Running totals exposed as metrics.
#[derive(Debug, Default)]
pub struct SchedulerStats {
    pub dispatched: AtomicU64,
    pub dispatch_failures: AtomicU64,
    pub init_failures: AtomicU64,
    pub completed_ranges: AtomicU64,
    pub jobs_finished: AtomicU64,
}

/// What a single dispatch tick did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TickReport {
    /// Whether a job was active when the tick ran.
    pub active: bool,
    pub workers: usize,
    pub initialized: usize,
    pub init_failures: usize,
    pub dispatched: usize,
    pub dispatch_failures: usize,
    /// Ranges returned to the pool by reconciliation.
    pub reclaimed: usize,
}

/// Owns the active job and the partitioner.
///
/// Locks are always taken job first, partitioner second.
pub struct Scheduler {
    pub(crate) config: Config,
    strategies: StrategyRegistry,
    pub(crate) source: Arc<dyn WorkerSource>,
    pub(crate) gateway: Arc<dyn WorkerGateway>,
    pub(crate) combiner: Arc<dyn ResultCombiner>,
    pub(crate) job: Mutex<Option<Job>>,
    pub(crate) partitioner: Mutex<Partitioner>,
    pub(crate) stats: SchedulerStats,
}

impl Scheduler {
    /// Create an idle scheduler.
    pub fn new(
        config: Config,
        strategies: StrategyRegistry,
        source: Arc<dyn WorkerSource>,
        gateway: Arc<dyn WorkerGateway>,
        combiner: Arc<dyn ResultCombiner>,
    ) -> Self {
        let partitioner =
            Partitioner::new(config.chunk_size, config.batch_size, config.callback_url());
        Self {
            config,
            strategies,
            source,
            gateway,
            combiner,
            job: Mutex::new(None),
            partitioner: Mutex::new(partitioner),
            stats: SchedulerStats::default(),
        }
    }

    /// Start a job over the named dataset. Rejected while one is running.
    pub async fn start_job(&self, dataset_name: &str) -> Result<Job, JobError> {
        let mut current = self.job.lock().await;
        if let Some(job) = current.as_ref() {
            return Err(JobError::AlreadyActive(job.id.clone()));
        }

        let job = Job::prepare(&self.config, &self.strategies, dataset_name).await?;
        self.partitioner
            .lock()
            .await
            .start(job.final_boundary.clone());
        self.combiner.reset();

        info!(
            job_id = %job.id,
            dataset = %job.dataset_name,
            strategy = %job.strategy,
            final_boundary = %job.final_boundary,
            "Job started"
        );

        *current = Some(job.clone());
        Ok(job)
    }

    /// Whether a job is running.
    pub async fn is_active(&self) -> bool {
        self.job.lock().await.is_some()
    }

    /// Progress of the active job.
    pub async fn status(&self) -> Option<JobStatus> {
        let job = self.job.lock().await;
        let job = job.as_ref()?;
        let partitioner = self.partitioner.lock().await;

        Some(JobStatus {
            job_id: job.id.clone(),
            dataset: job.dataset_name.clone(),
            strategy: job.strategy.clone(),
            final_boundary: job.final_boundary.clone(),
            cursor: partitioner.cursor().clone(),
            pending: partitioner.pending_len(),
            assigned: partitioner.assigned_len(),
            started_at: job.started_at,
            best_result: self.combiner.best(),
        })
    }

    pub fn stats(&self) -> &SchedulerStats {
        &self.stats
    }

    /// Best result across all completed ranges of the current or last job.
    pub fn best_result(&self) -> Option<serde_json::Value> {
        self.combiner.best()
    }

    /// Dispatch forever on the configured period.
    pub async fn run(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(self.config.dispatch_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            interval_ms = self.config.dispatch_interval.as_millis() as u64,
            "Dispatch loop started"
        );

        loop {
            ticker.tick().await;
            match self.tick().await {
                Ok(report) if report.active => debug!(?report, "Dispatch tick finished"),
                Ok(_) => {}
                Err(e) => warn!(error = %e, "Dispatch tick skipped"),
            }
        }
    }

    /// Run one dispatch pass.
    ///
    /// Fails only when the worker set cannot be fetched; per-worker errors
    /// are counted in the report.
    pub async fn tick(&self) -> Result<TickReport, GatewayError> {
        let (job_id, bundle) = match self.job.lock().await.as_ref() {
            Some(job) => (job.id.clone(), job.bundle.clone()),
            None => return Ok(TickReport::default()),
        };

        let workers = self.source.live_workers().await?;
        let mut report = TickReport {
            active: true,
            workers: workers.len(),
            ..TickReport::default()
        };

        for worker in &workers {
            if !self.is_current(&job_id).await {
                debug!(job_id = %job_id, "Job ended mid-tick, stopping dispatch");
                break;
            }
            match worker.worker_status {
                WorkerStatus::Uninitialized => {
                    match self.gateway.init(&worker.addr, &bundle).await {
                        Ok(()) => {
                            info!(worker = %worker.addr, "Worker initialized");
                            report.initialized += 1;
                        }
                        Err(e) => {
                            warn!(worker = %worker.addr, error = %e, "Worker init failed");
                            self.stats.init_failures.fetch_add(1, Ordering::Relaxed);
                            report.init_failures += 1;
                        }
                    }
                }
                WorkerStatus::Free => self.dispatch(&job_id, &worker.addr, &mut report).await,
                WorkerStatus::Working => {}
            }
        }

        let live: HashSet<WorkerAddr> = workers.into_iter().map(|w| w.addr).collect();
        report.reclaimed = self.partitioner.lock().await.reconcile(&live);

        Ok(report)
    }

    async fn is_current(&self, job_id: &JobId) -> bool {
        self.job.lock().await.as_ref().map(|j| &j.id) == Some(job_id)
    }

    /// Hand the next range to a FREE worker.
    async fn dispatch(&self, job_id: &JobId, worker: &WorkerAddr, report: &mut TickReport) {
        let range = {
            let job = self.job.lock().await;
            if job.as_ref().map(|j| &j.id) != Some(job_id) {
                return;
            }
            self.partitioner.lock().await.assign_next(worker.clone())
        };

        let Some(range) = range else {
            debug!(worker = %worker, "No range left to dispatch");
            return;
        };

        match self.gateway.solve(worker, &range).await {
            Ok(()) => {
                info!(worker = %worker, start = %range.start, end = %range.end, "Range dispatched");
                self.stats.dispatched.fetch_add(1, Ordering::Relaxed);
                report.dispatched += 1;
            }
            Err(e) => {
                warn!(worker = %worker, range = %range, error = %e, "Dispatch failed");
                self.partitioner.lock().await.release(&range);
                self.stats.dispatch_failures.fetch_add(1, Ordering::Relaxed);
                report.dispatch_failures += 1;
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use tempfile::TempDir;

    use routeshard_core::{BestCostCombiner, TaskRange, Worker};

    use crate::job::tests::fixture;
    use crate::job::InitBundle;

    /// Worker list that tests can rewrite between ticks.
    #[derive(Default)]
    pub(crate) struct FakeSource {
        pub workers: StdMutex<Vec<Worker>>,
        pub fail: StdMutex<bool>,
    }

    impl FakeSource {
        pub fn set(&self, workers: Vec<Worker>) {
            *self.workers.lock().unwrap() = workers;
        }
    }

    #[async_trait]
    impl WorkerSource for FakeSource {
        async fn live_workers(&self) -> Result<Vec<Worker>, GatewayError> {
            if *self.fail.lock().unwrap() {
                return Err(GatewayError::Rejected {
                    url: "manager".into(),
                    status: 503,
                    message: "down".into(),
                });
            }
            Ok(self.workers.lock().unwrap().clone())
        }
    }

    /// Records every call; workers listed in `refuse` answer with an error.
    #[derive(Default)]
    pub(crate) struct FakeGateway {
        pub inits: StdMutex<Vec<WorkerAddr>>,
        pub solves: StdMutex<Vec<(WorkerAddr, TaskRange)>>,
        pub resets: StdMutex<Vec<WorkerAddr>>,
        pub refuse: StdMutex<Vec<WorkerAddr>>,
        /// Workers whose init takes this long before answering.
        pub slow_init: StdMutex<Option<(WorkerAddr, Duration)>>,
    }

    impl FakeGateway {
        fn check(&self, worker: &WorkerAddr) -> Result<(), GatewayError> {
            if self.refuse.lock().unwrap().contains(worker) {
                return Err(GatewayError::Rejected {
                    url: worker.to_string(),
                    status: 409,
                    message: "busy".into(),
                });
            }
            Ok(())
        }

        pub fn solved(&self) -> Vec<(WorkerAddr, (u64, u64))> {
            self.solves
                .lock()
                .unwrap()
                .iter()
                .map(|(w, r)| (w.clone(), (r.start.to_u64().unwrap(), r.end.to_u64().unwrap())))
                .collect()
        }
    }

    #[async_trait]
    impl WorkerGateway for FakeGateway {
        async fn init(&self, worker: &WorkerAddr, _bundle: &InitBundle) -> Result<(), GatewayError> {
            let delay = match &*self.slow_init.lock().unwrap() {
                Some((slow, delay)) if slow == worker => Some(*delay),
                _ => None,
            };
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            self.check(worker)?;
            self.inits.lock().unwrap().push(worker.clone());
            Ok(())
        }

        async fn solve(&self, worker: &WorkerAddr, range: &TaskRange) -> Result<(), GatewayError> {
            self.check(worker)?;
            self.solves.lock().unwrap().push((worker.clone(), range.clone()));
            Ok(())
        }

        async fn reset(&self, worker: &WorkerAddr) -> Result<(), GatewayError> {
            self.check(worker)?;
            self.resets.lock().unwrap().push(worker.clone());
            Ok(())
        }
    }

    pub(crate) struct Harness {
        pub _dir: TempDir,
        pub scheduler: Arc<Scheduler>,
        pub source: Arc<FakeSource>,
        pub gateway: Arc<FakeGateway>,
    }

    /// Four-city dataset (space of 6) split into chunks of 2, batches of 2.
    pub(crate) fn harness() -> Harness {
        let (dir, mut config) = fixture();
        config.chunk_size = 2;
        config.batch_size = 2;

        let source = Arc::new(FakeSource::default());
        let gateway = Arc::new(FakeGateway::default());
        let scheduler = Arc::new(Scheduler::new(
            config,
            StrategyRegistry::with_defaults(),
            source.clone(),
            gateway.clone(),
            Arc::new(BestCostCombiner::new()),
        ));

        Harness {
            _dir: dir,
            scheduler,
            source,
            gateway,
        }
    }

    pub(crate) fn worker(port: u16, status: WorkerStatus) -> Worker {
        Worker::new(WorkerAddr::new("10.0.0.1", port)).with_status(status)
    }

    #[tokio::test]
    async fn test_idle_tick_does_nothing() {
        let h = harness();
        h.source.set(vec![worker(1, WorkerStatus::Free)]);

        let report = h.scheduler.tick().await.unwrap();

        assert!(!report.active);
        assert!(h.gateway.solved().is_empty());
    }

    #[tokio::test]
    async fn test_start_rejected_while_active() {
        let h = harness();
        let first = h.scheduler.start_job("cities.json").await.unwrap();

        let err = h.scheduler.start_job("cities.json").await.unwrap_err();
        assert!(matches!(err, JobError::AlreadyActive(id) if id == first.id));
    }

    #[tokio::test]
    async fn test_tick_routes_by_status() {
        let h = harness();
        h.scheduler.start_job("cities.json").await.unwrap();
        h.source.set(vec![
            worker(1, WorkerStatus::Uninitialized),
            worker(2, WorkerStatus::Free),
            worker(3, WorkerStatus::Working),
        ]);

        let report = h.scheduler.tick().await.unwrap();

        assert_eq!(report.initialized, 1);
        assert_eq!(report.dispatched, 1);
        assert_eq!(*h.gateway.inits.lock().unwrap(), vec![WorkerAddr::new("10.0.0.1", 1)]);
        assert_eq!(
            h.gateway.solved(),
            vec![(WorkerAddr::new("10.0.0.1", 2), (0, 2))]
        );
    }

    #[tokio::test]
    async fn test_dispatched_range_carries_callback() {
        let h = harness();
        h.scheduler.start_job("cities.json").await.unwrap();
        h.source.set(vec![worker(2, WorkerStatus::Free)]);

        h.scheduler.tick().await.unwrap();

        let solves = h.gateway.solves.lock().unwrap();
        assert_eq!(solves[0].1.callback_url, "http://localhost:8080/result");
    }

    #[tokio::test]
    async fn test_failing_worker_does_not_abort_tick() {
        let h = harness();
        h.scheduler.start_job("cities.json").await.unwrap();
        h.source.set(vec![
            worker(1, WorkerStatus::Free),
            worker(2, WorkerStatus::Uninitialized),
            worker(3, WorkerStatus::Free),
        ]);
        h.gateway
            .refuse
            .lock()
            .unwrap()
            .extend([WorkerAddr::new("10.0.0.1", 1), WorkerAddr::new("10.0.0.1", 2)]);

        let report = h.scheduler.tick().await.unwrap();

        assert_eq!(report.dispatch_failures, 1);
        assert_eq!(report.init_failures, 1);
        assert_eq!(report.dispatched, 1);
        // The refused range went back to the pool and was reused.
        assert_eq!(
            h.gateway.solved(),
            vec![(WorkerAddr::new("10.0.0.1", 3), (0, 2))]
        );
    }

    #[tokio::test]
    async fn test_evicted_workers_range_is_redispatched() {
        let h = harness();
        h.scheduler.start_job("cities.json").await.unwrap();

        h.source.set(vec![worker(1, WorkerStatus::Free)]);
        h.scheduler.tick().await.unwrap();

        // Worker 1 vanishes; worker 2 shows up free.
        h.source.set(vec![worker(2, WorkerStatus::Free)]);
        let report = h.scheduler.tick().await.unwrap();
        assert_eq!(report.reclaimed, 1);
        assert_eq!(
            h.gateway.solved().last().unwrap(),
            &(WorkerAddr::new("10.0.0.1", 2), (2, 4))
        );

        h.scheduler.tick().await.unwrap();
        assert_eq!(
            h.gateway.solved().last().unwrap(),
            &(WorkerAddr::new("10.0.0.1", 2), (0, 2))
        );
    }

    #[tokio::test]
    async fn test_job_finishing_mid_tick_stops_inits() {
        let h = harness();
        h.scheduler.start_job("cities.json").await.unwrap();
        h.source.set(vec![
            worker(1, WorkerStatus::Uninitialized),
            worker(2, WorkerStatus::Uninitialized),
        ]);
        *h.gateway.slow_init.lock().unwrap() =
            Some((WorkerAddr::new("10.0.0.1", 1), Duration::from_millis(200)));

        let tick = tokio::spawn({
            let scheduler = h.scheduler.clone();
            async move { scheduler.tick().await }
        });
        tokio::time::sleep(Duration::from_millis(50)).await;

        let tail = serde_json::json!({
            "result": {"totalCost": 21, "route": [0, 1, 3, 2, 0]},
            "task": {"start": "4", "end": "6", "callbackUrl": "cb"},
        });
        h.scheduler.handle_completion(tail).await.unwrap();
        let report = tick.await.unwrap().unwrap();

        assert!(!h.scheduler.is_active().await);
        assert_eq!(report.initialized, 1);
        assert_eq!(
            *h.gateway.inits.lock().unwrap(),
            vec![WorkerAddr::new("10.0.0.1", 1)]
        );
    }

    #[tokio::test]
    async fn test_manager_outage_skips_tick() {
        let h = harness();
        h.scheduler.start_job("cities.json").await.unwrap();
        *h.source.fail.lock().unwrap() = true;

        assert!(h.scheduler.tick().await.is_err());
        assert!(h.scheduler.is_active().await);
    }

    #[tokio::test]
    async fn test_status_reports_progress() {
        let h = harness();
        assert!(h.scheduler.status().await.is_none());

        h.scheduler.start_job("cities.json").await.unwrap();
        h.source.set(vec![worker(1, WorkerStatus::Free)]);
        h.scheduler.tick().await.unwrap();

        let status = h.scheduler.status().await.unwrap();
        assert_eq!(status.final_boundary.to_u64(), Some(6));
        assert_eq!(status.cursor.to_u64(), Some(4));
        assert_eq!(status.pending, 2);
        assert_eq!(status.assigned, 1);
    }
}
