//! Job identity, execution, and results access
//!
//! The manager is the only component that mutates job metadata or the
//! results store. Each submission allocates a fresh id, inserts a running
//! entry, executes the matching pipeline synchronously, persists the
//! produced records, and transitions the entry to its terminal status.
//! Pipeline failures are recorded on the job before being re-signaled to
//! the caller.

use crate::crawling::{financial, generic};
use crate::domain::{Job, JobId, JobStatus, Record, SpiderConfig};
use crate::infrastructure::fetcher::{FetchError, PageFetcher};
use crate::infrastructure::quotes::QuoteProvider;
use crate::infrastructure::results_store::{ResultsStore, StoreError};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{error, info};

#[derive(Error, Debug)]
pub enum JobError {
    #[error("job {0} not found")]
    NotFound(String),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Returned to the caller when a job run finishes successfully.
#[derive(Debug, Serialize)]
pub struct JobOutcome {
    pub job_id: JobId,
    pub status: JobStatus,
    pub results: Vec<Record>,
}

/// Results lookup response: the persisted records for a completed job, or
/// a status indicator for a job that is not completed.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum JobResults {
    Records(Vec<Record>),
    Pending { status: JobStatus },
}

/// Owns the in-memory job registry and drives both pipelines.
///
/// The registry grows for the process lifetime; there is no eviction and
/// no deletion API.
pub struct JobManager {
    jobs: RwLock<HashMap<JobId, Job>>,
    store: ResultsStore,
    fetcher: Arc<dyn PageFetcher>,
    quotes: Arc<dyn QuoteProvider>,
}

impl JobManager {
    pub fn new(
        store: ResultsStore,
        fetcher: Arc<dyn PageFetcher>,
        quotes: Arc<dyn QuoteProvider>,
    ) -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
            store,
            fetcher,
            quotes,
        }
    }

    /// Run the generic spider against a URL, synchronously.
    pub async fn run_scrape(
        &self,
        url: &str,
        config: &SpiderConfig,
    ) -> Result<JobOutcome, JobError> {
        let job_id = self.begin_job(url).await;
        let result = generic::crawl(self.fetcher.as_ref(), url, config).await;
        self.finish_job(job_id, result).await
    }

    /// Run the financial pipeline for a ticker, synchronously.
    pub async fn run_financial(
        &self,
        ticker: &str,
        config: &SpiderConfig,
    ) -> Result<JobOutcome, JobError> {
        let job_id = self.begin_job(ticker).await;
        let result =
            financial::crawl(self.fetcher.as_ref(), self.quotes.as_ref(), ticker, config).await;
        self.finish_job(job_id, result).await
    }

    /// Snapshot of all tracked jobs, running and terminal.
    pub async fn list_jobs(&self) -> Vec<Job> {
        self.jobs.read().await.values().cloned().collect()
    }

    /// Look up the persisted results for a job.
    pub async fn get_results(&self, job_id: JobId) -> Result<JobResults, JobError> {
        let job = self
            .jobs
            .read()
            .await
            .get(&job_id)
            .cloned()
            .ok_or_else(|| JobError::NotFound(job_id.to_string()))?;

        if job.status != JobStatus::Completed {
            return Ok(JobResults::Pending { status: job.status });
        }
        Ok(JobResults::Records(
            self.store.read_records(&job.output_file).await,
        ))
    }

    async fn begin_job(&self, target: &str) -> JobId {
        let job_id = JobId::new();
        let job = Job::new(job_id, target, self.store.output_path(job_id));
        info!("Job {} started for target: {}", job_id, target);
        self.jobs.write().await.insert(job_id, job);
        job_id
    }

    async fn finish_job(
        &self,
        job_id: JobId,
        result: Result<Vec<Record>, FetchError>,
    ) -> Result<JobOutcome, JobError> {
        match result {
            Ok(records) => match self.store.write_records(job_id, &records).await {
                Ok(()) => {
                    self.transition(job_id, None).await;
                    info!("Job {} completed with {} record(s)", job_id, records.len());
                    Ok(JobOutcome {
                        job_id,
                        status: JobStatus::Completed,
                        results: records,
                    })
                }
                Err(store_error) => {
                    error!("Job {} failed to persist results: {}", job_id, store_error);
                    self.transition(job_id, Some(store_error.to_string())).await;
                    Err(store_error.into())
                }
            },
            Err(fetch_error) => {
                error!("Job {} failed: {}", job_id, fetch_error);
                self.transition(job_id, Some(fetch_error.to_string())).await;
                Err(fetch_error.into())
            }
        }
    }

    /// Move a job to its terminal status (failed when an error is given).
    async fn transition(&self, job_id: JobId, error: Option<String>) {
        let mut jobs = self.jobs.write().await;
        if let Some(job) = jobs.get_mut(&job_id) {
            match error {
                Some(message) => job.fail(message),
                None => job.complete(),
            }
        }
    }
}
