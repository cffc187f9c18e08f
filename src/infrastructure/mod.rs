//! Infrastructure layer: HTTP fetching, quote provider, persistence,
//! configuration, and logging.

pub mod config;
pub mod fetcher;
pub mod logging;
pub mod quotes;
pub mod results_store;

pub use config::{AppConfig, ConfigManager, CrawlerConfig, LoggingConfig, ServerConfig, StorageConfig};
pub use fetcher::{FetchError, FetchedPage, HttpFetcher, PageFetcher};
pub use logging::init_logging;
pub use quotes::{CompanyProfile, HistoricalBar, ProviderError, QuoteProvider, YahooQuoteProvider};
pub use results_store::{ResultsStore, StoreError};
