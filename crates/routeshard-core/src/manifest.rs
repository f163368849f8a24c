//! Job manifest: names the solving strategy for a dataset.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Manifest shipped alongside every dataset.
///
/// Only `strategy` is interpreted here; any other keys are carried through
/// untouched for the strategy's own use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    /// Name the strategy is registered under in a `StrategyRegistry`.
    pub strategy: String,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Manifest {
    pub fn new(strategy: impl Into<String>) -> Self {
        Self {
            strategy: strategy.into(),
            extra: serde_json::Map::new(),
        }
    }

    /// Parse a manifest from raw JSON bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CoreError> {
        serde_json::from_slice(bytes).map_err(|e| CoreError::InvalidManifest(e.to_string()))
    }

    /// Read and parse a manifest file.
    pub fn from_file(path: &Path) -> Result<Self, CoreError> {
        let bytes = std::fs::read(path).map_err(|e| {
            CoreError::InvalidManifest(format!("failed to read '{}': {}", path.display(), e))
        })?;
        Self::from_slice(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_keeps_extra_keys() {
        let manifest =
            Manifest::from_slice(br#"{"strategy":"brute-force-tour","author":"ops"}"#).unwrap();
        assert_eq!(manifest.strategy, "brute-force-tour");
        assert_eq!(manifest.extra["author"], "ops");
    }

    #[test]
    fn test_missing_strategy_is_rejected() {
        let err = Manifest::from_slice(br#"{"className":"Foo"}"#).unwrap_err();
        assert!(matches!(err, CoreError::InvalidManifest(_)));
    }
}
