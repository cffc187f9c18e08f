//! Application layer: job orchestration use cases.

pub mod job_manager;

pub use job_manager::{JobError, JobManager, JobOutcome, JobResults};
