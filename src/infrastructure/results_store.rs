//! Per-job result persistence
//!
//! One pretty-printed JSON array per job, named by job id, written once at
//! job completion. Reads are lenient: a missing or corrupt artifact yields
//! an empty sequence, matching the behavior callers rely on.

use crate::domain::{JobId, Record};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("failed to write results file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize results: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to create results directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Flat-file store for extracted record sequences.
#[derive(Debug, Clone)]
pub struct ResultsStore {
    results_dir: PathBuf,
}

impl ResultsStore {
    /// Create the store, ensuring the results directory exists.
    pub async fn initialize(results_dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let results_dir = results_dir.into();
        if !results_dir.exists() {
            fs::create_dir_all(&results_dir)
                .await
                .map_err(|source| StoreError::CreateDir {
                    path: results_dir.clone(),
                    source,
                })?;
            info!("Created results directory: {:?}", results_dir);
        }
        Ok(Self { results_dir })
    }

    /// Deterministic output path for a job id.
    pub fn output_path(&self, job_id: JobId) -> PathBuf {
        self.results_dir.join(format!("{job_id}.json"))
    }

    /// Persist the record sequence for a job (write-once, pretty JSON).
    pub async fn write_records(&self, job_id: JobId, records: &[Record]) -> Result<(), StoreError> {
        let path = self.output_path(job_id);
        let json = serde_json::to_vec_pretty(records)?;
        fs::write(&path, json)
            .await
            .map_err(|source| StoreError::Write {
                path: path.clone(),
                source,
            })?;
        info!("Persisted {} record(s) to {:?}", records.len(), path);
        Ok(())
    }

    /// Read a persisted record sequence back. Missing or corrupt files yield
    /// an empty sequence rather than an error.
    pub async fn read_records(&self, path: &Path) -> Vec<Record> {
        match fs::read_to_string(path).await {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(records) => records,
                Err(error) => {
                    warn!("Corrupt results file {:?}: {}", path, error);
                    Vec::new()
                }
            },
            Err(error) => {
                warn!("Results file {:?} not readable: {}", path, error);
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Value;

    fn sample_records() -> Vec<Record> {
        let mut record = Record::new();
        record.insert("url", Value::from("http://example.test/a"));
        record.insert("title", Value::from("Example"));
        vec![record]
    }

    #[tokio::test]
    async fn write_then_read_returns_same_records() {
        let dir = tempfile::tempdir().unwrap();
        let store = ResultsStore::initialize(dir.path()).await.unwrap();
        let job_id = JobId::new();
        let records = sample_records();

        store.write_records(job_id, &records).await.unwrap();
        let read_back = store.read_records(&store.output_path(job_id)).await;
        assert_eq!(read_back, records);
    }

    #[tokio::test]
    async fn missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = ResultsStore::initialize(dir.path()).await.unwrap();
        let read_back = store.read_records(&store.output_path(JobId::new())).await;
        assert!(read_back.is_empty());
    }

    #[tokio::test]
    async fn corrupt_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = ResultsStore::initialize(dir.path()).await.unwrap();
        let job_id = JobId::new();
        let path = store.output_path(job_id);
        tokio::fs::write(&path, b"{not json").await.unwrap();

        let read_back = store.read_records(&path).await;
        assert!(read_back.is_empty());
    }

    #[tokio::test]
    async fn output_is_pretty_printed_utf8(){
        let dir = tempfile::tempdir().unwrap();
        let store = ResultsStore::initialize(dir.path()).await.unwrap();
        let job_id = JobId::new();
        store.write_records(job_id, &sample_records()).await.unwrap();

        let raw = tokio::fs::read_to_string(store.output_path(job_id)).await.unwrap();
        assert!(raw.starts_with("[\n"));
        assert!(raw.contains("\"url\""));
    }
}
