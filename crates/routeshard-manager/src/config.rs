//! Manager configuration.

use std::time::Duration;

/// Hard ceiling on probes in flight, whatever the configuration says.
pub const MAX_CONCURRENT_PROBES: usize = 10;

/// Manager configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server bind address.
    pub bind_addr: String,

    /// Failure detector settings.
    pub health: HealthConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8081".to_string(),
            health: HealthConfig::default(),
        }
    }
}

/// Failure detector configuration.
#[derive(Debug, Clone)]
pub struct HealthConfig {
    /// Period between health sweeps.
    pub sweep_interval: Duration,

    /// Deadline for a single worker's state probe.
    pub probe_timeout: Duration,

    /// How long one sweep may run before unfinished probes are cancelled.
    pub sweep_window: Duration,

    /// Upper bound on probes in flight at once. Clamped to
    /// [`MAX_CONCURRENT_PROBES`].
    pub max_concurrent_probes: usize,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            sweep_interval: Duration::from_secs(5),
            probe_timeout: Duration::from_secs(3),
            sweep_window: Duration::from_secs(5),
            max_concurrent_probes: MAX_CONCURRENT_PROBES,
        }
    }
}
