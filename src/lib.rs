//! Global Insights - web scraping and financial data extraction API
//!
//! Exposes an HTTP API that runs selector-driven scraping jobs against
//! arbitrary URLs and statement-extraction jobs against a financial-data
//! site, tracks job status in memory, and persists extracted records as
//! per-job JSON files.

pub mod api;
pub mod application;
pub mod crawling;
pub mod domain;
pub mod infrastructure;

pub use application::{JobError, JobManager, JobOutcome, JobResults};
pub use domain::{Job, JobId, JobStatus, Record, SelectorSpec, SpiderConfig, Value};
pub use infrastructure::{
    AppConfig, ConfigManager, HttpFetcher, PageFetcher, QuoteProvider, ResultsStore,
    YahooQuoteProvider,
};
