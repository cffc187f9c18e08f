//! Domain types: jobs, records, and extraction configuration.

pub mod job;
pub mod record;
pub mod spider_config;

pub use job::{Job, JobId, JobStatus};
pub use record::{Record, Value};
pub use spider_config::{SelectorSpec, SpiderConfig};
