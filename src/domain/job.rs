//! In-memory job metadata and lifecycle
//!
//! A job tracks exactly one crawl/extraction run. Entries live in the
//! manager's registry for the life of the process and are mutated only
//! during the run; once terminal they are read-only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use uuid::Uuid;

/// Opaque unique job identifier (UUID v4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for JobId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Current status of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Running,
    Completed,
    Failed,
}

/// Metadata for one tracked crawl/extraction run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    /// Target URL or ticker symbol the job was submitted with.
    pub target: String,
    pub status: JobStatus,
    pub started_at: DateTime<Utc>,
    /// Set exactly when the job reaches a terminal status.
    pub finished_at: Option<DateTime<Utc>>,
    /// Path of the persisted record sequence, derived from the job id.
    pub output_file: PathBuf,
    /// Present only when the job failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Job {
    pub fn new(id: JobId, target: impl Into<String>, output_file: PathBuf) -> Self {
        Self {
            id,
            target: target.into(),
            status: JobStatus::Running,
            started_at: Utc::now(),
            finished_at: None,
            output_file,
            error: None,
        }
    }

    /// Mark the job completed. Only a running job can transition.
    pub fn complete(&mut self) {
        if self.status == JobStatus::Running {
            self.status = JobStatus::Completed;
            self.finished_at = Some(Utc::now());
        }
    }

    /// Mark the job failed with the given error message.
    pub fn fail(&mut self, error: impl Into<String>) {
        if self.status == JobStatus::Running {
            self.status = JobStatus::Failed;
            self.error = Some(error.into());
            self.finished_at = Some(Utc::now());
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.status, JobStatus::Completed | JobStatus::Failed)
    }
}
