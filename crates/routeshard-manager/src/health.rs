//! Failure detector.
//!
//! Every sweep probes all registered workers in parallel, at most
//! `max_concurrent_probes` (never more than ten) at a time, each under its own timeout. A probe
//! that errors or times out evicts its worker. Probes still unfinished when
//! the sweep window closes are cancelled without evicting anyone.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use routeshard_core::{WorkerAddr, WorkerStatus};

use crate::config::{HealthConfig, MAX_CONCURRENT_PROBES};
use crate::probe::StateProbe;
use crate::registry::WorkerRegistry;

/// Result of one worker's probe.
enum ProbeVerdict {
    Alive(WorkerStatus),
    Failed(String),
    TimedOut,
}

/// Summary of a single sweep.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepReport {
    /// Workers in the snapshot the sweep started from.
    pub probed: usize,
    /// Workers that answered.
    pub healthy: usize,
    /// Workers removed from the registry.
    pub evicted: Vec<WorkerAddr>,
    /// Probes cancelled by the sweep window.
    pub cancelled: usize,
}

/// Periodically probes registered workers and evicts unresponsive ones.
pub struct HealthSweeper {
    registry: Arc<WorkerRegistry>,
    probe: Arc<dyn StateProbe>,
    config: HealthConfig,
}

impl HealthSweeper {
    /// Creates a new sweeper.
    pub fn new(
        registry: Arc<WorkerRegistry>,
        probe: Arc<dyn StateProbe>,
        config: HealthConfig,
    ) -> Self {
        Self {
            registry,
            probe,
            config,
        }
    }

    /// Sweep forever on the configured period.
    pub async fn run(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(self.config.sweep_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            interval_ms = self.config.sweep_interval.as_millis() as u64,
            probe_timeout_ms = self.config.probe_timeout.as_millis() as u64,
            "Health sweeper started"
        );

        loop {
            ticker.tick().await;
            let report = self.sweep().await;
            if report.probed > 0 {
                debug!(
                    probed = report.probed,
                    healthy = report.healthy,
                    evicted = report.evicted.len(),
                    cancelled = report.cancelled,
                    "Health sweep finished"
                );
            }
        }
    }

    /// Probe every currently registered worker once.
    pub async fn sweep(&self) -> SweepReport {
        let workers = self.registry.snapshot().await;
        let mut report = SweepReport {
            probed: workers.len(),
            ..SweepReport::default()
        };
        if workers.is_empty() {
            return report;
        }

        let limit = workers
            .len()
            .min(self.config.max_concurrent_probes)
            .min(MAX_CONCURRENT_PROBES)
            .max(1);
        let permits = Arc::new(Semaphore::new(limit));
        let mut probes = JoinSet::new();

        for worker in workers {
            let permits = Arc::clone(&permits);
            let probe = Arc::clone(&self.probe);
            let timeout = self.config.probe_timeout;

            probes.spawn(async move {
                // The probe timeout only starts once a slot is free.
                let _permit = permits.acquire_owned().await;
                let verdict = match tokio::time::timeout(timeout, probe.check_state(&worker.addr))
                    .await
                {
                    Ok(Ok(status)) => ProbeVerdict::Alive(status),
                    Ok(Err(e)) => ProbeVerdict::Failed(e.to_string()),
                    Err(_) => ProbeVerdict::TimedOut,
                };
                (worker.addr, verdict)
            });
        }

        let window = tokio::time::sleep(self.config.sweep_window);
        tokio::pin!(window);

        loop {
            tokio::select! {
                joined = probes.join_next() => match joined {
                    Some(Ok((addr, verdict))) => self.apply(addr, verdict, &mut report).await,
                    Some(Err(e)) => warn!(error = %e, "Probe task failed"),
                    None => break,
                },
                _ = &mut window => {
                    report.cancelled = probes.len();
                    if report.cancelled > 0 {
                        warn!(pending = report.cancelled, "Sweep window elapsed, cancelling probes");
                    }
                    probes.abort_all();
                    break;
                }
            }
        }

        report
    }

    async fn apply(&self, addr: WorkerAddr, verdict: ProbeVerdict, report: &mut SweepReport) {
        match verdict {
            ProbeVerdict::Alive(status) => {
                self.registry.update_status(&addr, status).await;
                report.healthy += 1;
            }
            ProbeVerdict::Failed(error) => {
                warn!(worker = %addr, error = %error, "State probe failed");
                if self.registry.evict(&addr).await {
                    report.evicted.push(addr);
                }
            }
            ProbeVerdict::TimedOut => {
                warn!(
                    worker = %addr,
                    timeout_ms = self.config.probe_timeout.as_millis() as u64,
                    "State probe timed out"
                );
                if self.registry.evict(&addr).await {
                    report.evicted.push(addr);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::probe::ProbeError;

    /// What the fake probe does for one worker port.
    #[derive(Clone, Copy)]
    enum Behavior {
        Answer(WorkerStatus),
        Refuse,
        Hang,
    }

    struct FakeProbe {
        behaviors: HashMap<u16, Behavior>,
        delay: Duration,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl FakeProbe {
        fn new(delay: Duration) -> Self {
            Self {
                behaviors: HashMap::new(),
                delay,
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
            }
        }

        fn with(mut self, port: u16, behavior: Behavior) -> Self {
            self.behaviors.insert(port, behavior);
            self
        }
    }

    #[async_trait]
    impl StateProbe for FakeProbe {
        async fn check_state(&self, worker: &WorkerAddr) -> Result<WorkerStatus, ProbeError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            let behavior = self
                .behaviors
                .get(&worker.port)
                .copied()
                .unwrap_or(Behavior::Answer(WorkerStatus::Free));

            let result = match behavior {
                Behavior::Answer(status) => {
                    tokio::time::sleep(self.delay).await;
                    Ok(status)
                }
                Behavior::Refuse => Err(ProbeError::MissingStatus(worker.clone())),
                Behavior::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(WorkerStatus::Free)
                }
            };

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            result
        }
    }

    fn config(probe_timeout: Duration, sweep_window: Duration) -> HealthConfig {
        HealthConfig {
            sweep_interval: Duration::from_secs(5),
            probe_timeout,
            sweep_window,
            max_concurrent_probes: 10,
        }
    }

    async fn registry_with(ports: impl IntoIterator<Item = u16>) -> Arc<WorkerRegistry> {
        let registry = Arc::new(WorkerRegistry::new());
        for port in ports {
            registry.register(WorkerAddr::new("127.0.0.1", port)).await;
        }
        registry
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded_by_ten() {
        let registry = registry_with(1..=25).await;
        let probe = Arc::new(FakeProbe::new(Duration::from_millis(30)));
        let sweeper = HealthSweeper::new(
            registry.clone(),
            probe.clone(),
            config(Duration::from_secs(1), Duration::from_secs(5)),
        );

        let report = sweeper.sweep().await;

        assert_eq!(report.probed, 25);
        assert_eq!(report.healthy, 25);
        assert_eq!(probe.max_in_flight.load(Ordering::SeqCst), 10);
        assert_eq!(registry.len().await, 25);
    }

    #[tokio::test]
    async fn test_configured_limit_above_ten_is_clamped() {
        let registry = registry_with(1..=25).await;
        let probe = Arc::new(FakeProbe::new(Duration::from_millis(30)));
        let mut config = config(Duration::from_secs(1), Duration::from_secs(5));
        config.max_concurrent_probes = 50;
        let sweeper = HealthSweeper::new(registry, probe.clone(), config);

        let report = sweeper.sweep().await;

        assert_eq!(report.healthy, 25);
        assert_eq!(probe.max_in_flight.load(Ordering::SeqCst), 10);
    }

    #[tokio::test]
    async fn test_small_pool_bounded_by_pool_size() {
        let registry = registry_with(1..=3).await;
        let probe = Arc::new(FakeProbe::new(Duration::from_millis(30)));
        let sweeper = HealthSweeper::new(
            registry,
            probe.clone(),
            config(Duration::from_secs(1), Duration::from_secs(5)),
        );

        sweeper.sweep().await;

        assert_eq!(probe.max_in_flight.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_timeout_and_failure_evict() {
        let registry = registry_with([1, 2, 3]).await;
        let probe = Arc::new(
            FakeProbe::new(Duration::from_millis(5))
                .with(2, Behavior::Hang)
                .with(3, Behavior::Refuse),
        );
        let sweeper = HealthSweeper::new(
            registry.clone(),
            probe,
            config(Duration::from_millis(100), Duration::from_secs(5)),
        );

        let report = sweeper.sweep().await;

        assert_eq!(report.healthy, 1);
        assert_eq!(report.evicted.len(), 2);
        let remaining = registry.snapshot().await;
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].addr.port, 1);
    }

    #[tokio::test]
    async fn test_successful_probe_updates_status() {
        let registry = registry_with([1]).await;
        let probe = Arc::new(
            FakeProbe::new(Duration::ZERO).with(1, Behavior::Answer(WorkerStatus::Working)),
        );
        let sweeper = HealthSweeper::new(
            registry.clone(),
            probe,
            config(Duration::from_secs(1), Duration::from_secs(5)),
        );

        sweeper.sweep().await;

        assert_eq!(
            registry.snapshot().await[0].worker_status,
            WorkerStatus::Working
        );
    }

    #[tokio::test]
    async fn test_window_cancellation_does_not_evict() {
        let registry = registry_with([1, 2]).await;
        let probe = Arc::new(
            FakeProbe::new(Duration::ZERO)
                .with(1, Behavior::Hang)
                .with(2, Behavior::Hang),
        );
        let sweeper = HealthSweeper::new(
            registry.clone(),
            probe,
            config(Duration::from_secs(10), Duration::from_millis(50)),
        );

        let report = sweeper.sweep().await;

        assert_eq!(report.cancelled, 2);
        assert!(report.evicted.is_empty());
        assert_eq!(registry.len().await, 2);
    }

    #[tokio::test]
    async fn test_empty_registry() {
        let registry = registry_with([]).await;
        let sweeper = HealthSweeper::new(
            registry,
            Arc::new(FakeProbe::new(Duration::ZERO)),
            HealthConfig::default(),
        );

        assert_eq!(sweeper.sweep().await, SweepReport::default());
    }
}
