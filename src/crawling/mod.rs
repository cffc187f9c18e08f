//! Crawl controllers and extraction strategies.
//!
//! Two independent pipelines: the generic spider for arbitrary URLs and the
//! financial spider for ticker statement pages. Both produce a sequence of
//! records from fetched pages; selection happens at the job-manager level.

pub mod financial;
pub mod generic;
pub mod selectors;
