//! Keep-the-cheapest result combiner.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, info, warn};

use super::{ResultCombiner, StrategyError};

/// What a `combine` call did with the offered result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombineOutcome {
    /// The result became the new best.
    Improved,
    /// The previous best was kept.
    Kept,
}

/// Keeps the result with the lowest `totalCost`, optionally mirroring it to a
/// JSON file.
#[derive(Debug, Default)]
pub struct BestCostCombiner {
    best: Mutex<Option<(f64, serde_json::Value)>>,
    persist_path: Option<PathBuf>,
}

impl BestCostCombiner {
    /// In-memory combiner.
    pub fn new() -> Self {
        Self::default()
    }

    /// Combiner that persists every improvement to `path`. A readable best
    /// result already at `path` seeds the combiner.
    pub fn with_persistence(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let seeded = std::fs::read(&path)
            .ok()
            .and_then(|bytes| serde_json::from_slice::<serde_json::Value>(&bytes).ok())
            .and_then(|value| cost_of(&value).ok().flatten().map(|cost| (cost, value)));

        if let Some((cost, _)) = &seeded {
            info!(path = %path.display(), cost, "Loaded previous best result");
        }

        Self {
            best: Mutex::new(seeded),
            persist_path: Some(path),
        }
    }

    fn persist(path: &Path, value: &serde_json::Value) -> Result<(), StrategyError> {
        let tmp = path.with_extension("tmp");
        let bytes = serde_json::to_vec_pretty(value)
            .map_err(|e| StrategyError::InvalidResult(e.to_string()))?;
        std::fs::write(&tmp, bytes)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }
}

/// `Ok(None)` for results that legitimately carry no cost (empty chunks).
fn cost_of(value: &serde_json::Value) -> Result<Option<f64>, StrategyError> {
    if value.get("route").is_none() {
        return Err(StrategyError::InvalidResult("missing 'route'".into()));
    }
    match value.get("totalCost") {
        None => Err(StrategyError::InvalidResult("missing 'totalCost'".into())),
        Some(serde_json::Value::Null) => Ok(None),
        Some(cost) => cost
            .as_f64()
            .map(Some)
            .ok_or_else(|| StrategyError::InvalidResult(format!("non-numeric 'totalCost': {cost}"))),
    }
}

impl ResultCombiner for BestCostCombiner {
    fn combine(&self, result: &serde_json::Value) -> Result<CombineOutcome, StrategyError> {
        let Some(cost) = cost_of(result)? else {
            return Ok(CombineOutcome::Kept);
        };

        let mut best = self.best.lock().unwrap_or_else(|e| e.into_inner());
        if matches!(best.as_ref(), Some((current, _)) if *current <= cost) {
            debug!(cost, "Result is not better than current best");
            return Ok(CombineOutcome::Kept);
        }

        if let Some(path) = &self.persist_path {
            if let Err(e) = Self::persist(path, result) {
                warn!(path = %path.display(), error = %e, "Failed to persist best result");
                return Err(e);
            }
        }

        info!(cost, "New best result");
        *best = Some((cost, result.clone()));
        Ok(CombineOutcome::Improved)
    }

    fn best(&self) -> Option<serde_json::Value> {
        self.best
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .map(|(_, value)| value.clone())
    }

    fn reset(&self) {
        *self.best.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }
}
