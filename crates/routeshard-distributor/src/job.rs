//! Job definition and start-time validation.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use routeshard_core::{CoreError, JobId, Manifest, SpaceIndex, StrategyError, StrategyRegistry};

use crate::config::Config;

/// Job errors.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("Job {0} is already running")]
    AlreadyActive(JobId),

    #[error("No such dataset: {0}")]
    DatasetNotFound(String),

    #[error("Solver artifact not found: {0}")]
    ArtifactNotFound(String),

    #[error("Manifest not found: {0}")]
    ManifestNotFound(String),

    #[error(transparent)]
    Manifest(#[from] CoreError),

    #[error(transparent)]
    Strategy(#[from] StrategyError),

    #[error("Dataset {0} has an empty search space")]
    EmptySpace(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Files every worker receives at init.
#[derive(Debug)]
pub struct InitBundle {
    pub artifact_name: String,
    pub artifact: Vec<u8>,
    pub dataset_name: String,
    pub dataset: Vec<u8>,
    pub manifest: Vec<u8>,
}

/// The single active job.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: JobId,
    pub dataset_name: String,
    pub strategy: String,
    pub final_boundary: SpaceIndex,
    pub started_at: DateTime<Utc>,
    pub bundle: Arc<InitBundle>,
}

impl Job {
    /// Resolve a dataset name into a ready-to-run job.
    ///
    /// The dataset must sit directly inside the upload directory, the
    /// artifact and manifest must exist, and the manifest's strategy must
    /// report a non-empty search space for the dataset.
    pub async fn prepare(
        config: &Config,
        strategies: &StrategyRegistry,
        dataset_name: &str,
    ) -> Result<Self, JobError> {
        let dataset_path = dataset_path(&config.upload_dir, dataset_name)
            .ok_or_else(|| JobError::DatasetNotFound(dataset_name.to_string()))?;

        let dataset = read_file(&dataset_path)
            .await?
            .ok_or_else(|| JobError::DatasetNotFound(dataset_name.to_string()))?;
        let artifact = read_file(&config.artifact_path)
            .await?
            .ok_or_else(|| JobError::ArtifactNotFound(config.artifact_path.display().to_string()))?;
        let manifest = read_file(&config.manifest_path)
            .await?
            .ok_or_else(|| JobError::ManifestNotFound(config.manifest_path.display().to_string()))?;

        let strategy_name = Manifest::from_slice(&manifest)?.strategy;
        let strategy = strategies.resolve(&strategy_name)?;
        let final_boundary = strategy.space_size(&dataset)?;
        if final_boundary.is_zero() {
            return Err(JobError::EmptySpace(dataset_name.to_string()));
        }

        let artifact_name = config
            .artifact_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "artifact".to_string());

        Ok(Self {
            id: JobId::generate(),
            dataset_name: dataset_name.to_string(),
            strategy: strategy_name,
            final_boundary,
            started_at: Utc::now(),
            bundle: Arc::new(InitBundle {
                artifact_name,
                artifact,
                dataset_name: dataset_name.to_string(),
                dataset,
                manifest,
            }),
        })
    }
}

/// Progress snapshot served by `GET /status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatus {
    pub job_id: JobId,
    pub dataset: String,
    pub strategy: String,
    pub final_boundary: SpaceIndex,
    pub cursor: SpaceIndex,
    pub pending: usize,
    pub assigned: usize,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub best_result: Option<serde_json::Value>,
}

/// Only plain file names inside the upload directory are accepted.
fn dataset_path(upload_dir: &Path, name: &str) -> Option<PathBuf> {
    let plain = !name.is_empty()
        && name != "."
        && !name.contains("..")
        && !name.contains('/')
        && !name.contains('\\');
    plain.then(|| upload_dir.join(name))
}

/// Read a regular file, mapping "not there" to `None`.
async fn read_file(path: &Path) -> Result<Option<Vec<u8>>, JobError> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_file() => Ok(Some(tokio::fs::read(path).await?)),
        Ok(_) => Ok(None),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    use tempfile::TempDir;

    pub(crate) const FOUR_CITIES: &str =
        r#"{"matrix": [[0, 2, 9, 10], [1, 0, 6, 4], [15, 7, 0, 8], [6, 3, 12, 0]], "city": 0}"#;

    /// Upload dir with `cities.json`, plus artifact and manifest.
    pub(crate) fn fixture() -> (TempDir, Config) {
        let dir = tempfile::tempdir().unwrap();
        let uploads = dir.path().join("uploads");
        std::fs::create_dir(&uploads).unwrap();
        std::fs::write(uploads.join("cities.json"), FOUR_CITIES).unwrap();
        std::fs::write(dir.path().join("solver.bin"), b"solver").unwrap();
        std::fs::write(
            dir.path().join("manifest.json"),
            r#"{"strategy": "brute-force-tour"}"#,
        )
        .unwrap();

        let config = Config {
            upload_dir: uploads,
            artifact_path: dir.path().join("solver.bin"),
            manifest_path: dir.path().join("manifest.json"),
            ..Config::default()
        };
        (dir, config)
    }

    #[tokio::test]
    async fn test_prepare_computes_boundary() {
        let (_dir, config) = fixture();
        let job = Job::prepare(&config, &StrategyRegistry::with_defaults(), "cities.json")
            .await
            .unwrap();

        assert_eq!(job.final_boundary.to_u64(), Some(6));
        assert_eq!(job.strategy, "brute-force-tour");
        assert_eq!(job.bundle.artifact, b"solver");
        assert_eq!(job.bundle.artifact_name, "solver.bin");
        assert_eq!(job.bundle.dataset_name, "cities.json");
    }

    #[tokio::test]
    async fn test_missing_dataset() {
        let (_dir, config) = fixture();
        let err = Job::prepare(&config, &StrategyRegistry::with_defaults(), "nope.json")
            .await
            .unwrap_err();
        assert!(matches!(err, JobError::DatasetNotFound(_)));
    }

    #[tokio::test]
    async fn test_path_escape_is_not_found() {
        let (dir, config) = fixture();
        std::fs::write(dir.path().join("outside.json"), FOUR_CITIES).unwrap();

        for name in ["../outside.json", "", "sub/cities.json", ".."] {
            let err = Job::prepare(&config, &StrategyRegistry::with_defaults(), name)
                .await
                .unwrap_err();
            assert!(matches!(err, JobError::DatasetNotFound(_)), "{name}");
        }
    }

    #[tokio::test]
    async fn test_missing_artifact() {
        let (dir, config) = fixture();
        std::fs::remove_file(dir.path().join("solver.bin")).unwrap();

        let err = Job::prepare(&config, &StrategyRegistry::with_defaults(), "cities.json")
            .await
            .unwrap_err();
        assert!(matches!(err, JobError::ArtifactNotFound(_)));
    }

    #[tokio::test]
    async fn test_unknown_strategy() {
        let (dir, config) = fixture();
        std::fs::write(dir.path().join("manifest.json"), r#"{"strategy": "annealing"}"#).unwrap();

        let err = Job::prepare(&config, &StrategyRegistry::with_defaults(), "cities.json")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            JobError::Strategy(StrategyError::UnknownStrategy(_))
        ));
    }

    #[tokio::test]
    async fn test_invalid_dataset() {
        let (_dir, config) = fixture();
        std::fs::write(config.upload_dir.join("bad.json"), "not json").unwrap();

        let err = Job::prepare(&config, &StrategyRegistry::with_defaults(), "bad.json")
            .await
            .unwrap_err();
        assert!(matches!(err, JobError::Strategy(_)));
    }
}
