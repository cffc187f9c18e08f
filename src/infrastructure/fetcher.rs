//! HTTP page fetcher with politeness policy
//!
//! Wraps reqwest with the crawl-side manners the extraction pipeline relies
//! on: a rate limiter enforcing the download delay, bounded retries with
//! exponential backoff on network errors and retryable status codes, and a
//! rotating User-Agent pool. The pipeline talks to the `PageFetcher` trait
//! so tests can substitute canned pages.

use crate::infrastructure::config::CrawlerConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use governor::clock::DefaultClock;
use governor::state::direct::NotKeyed;
use governor::state::InMemoryState;
use governor::{Quota, RateLimiter};
use reqwest::header::{HeaderValue, RETRY_AFTER, USER_AGENT};
use reqwest::{Client, ClientBuilder, StatusCode};
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// A successfully fetched page.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL after redirects.
    pub url: String,
    pub status: u16,
    pub body: String,
}

/// Failure after the retry budget is exhausted.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP status {status} fetching {url}")]
    Status { status: u16, url: String },

    #[error("failed to read response body from {url}: {source}")]
    Body {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Fetches one page, honoring delay/retry/timeout policy.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError>;
}

/// Production fetcher backed by reqwest.
pub struct HttpFetcher {
    client: Client,
    config: CrawlerConfig,
    rate_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
}

impl HttpFetcher {
    pub fn new(config: CrawlerConfig) -> Result<Self> {
        let client = ClientBuilder::new()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .cookie_store(true)
            .gzip(true)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .context("Failed to create HTTP client")?;

        // One request per download delay.
        let period = Duration::from_millis(config.download_delay_ms.max(1));
        let quota = Quota::with_period(period).context("Rate limit period must be non-zero")?;

        Ok(Self {
            client,
            config,
            rate_limiter: RateLimiter::direct(quota),
        })
    }

    fn pick_user_agent(&self) -> &str {
        if self.config.user_agents.is_empty() {
            "GlobalInsights/1.0"
        } else {
            let idx = fastrand::usize(..self.config.user_agents.len());
            &self.config.user_agents[idx]
        }
    }

    async fn apply_delay(&self) {
        self.rate_limiter.until_ready().await;
        if self.config.randomize_delay && self.config.download_delay_ms > 0 {
            // Random jitter on top of the base spacing.
            let jitter = fastrand::u64(0..=self.config.download_delay_ms / 2);
            if jitter > 0 {
                sleep(Duration::from_millis(jitter)).await;
            }
        }
    }

    fn is_retryable(&self, status: StatusCode) -> bool {
        self.config.retry_http_codes.contains(&status.as_u16())
    }

    fn user_agent_header(&self) -> HeaderValue {
        HeaderValue::from_str(self.pick_user_agent())
            .unwrap_or_else(|_| HeaderValue::from_static("GlobalInsights/1.0"))
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let max_attempts = self.config.max_retries.max(1);
        let mut last_error: Option<FetchError> = None;

        for attempt in 1..=max_attempts {
            self.apply_delay().await;
            info!("HTTP GET (attempt {}/{}): {}", attempt, max_attempts, url);

            let response = match self
                .client
                .get(url)
                .header(USER_AGENT, self.user_agent_header())
                .send()
                .await
            {
                Ok(response) => response,
                Err(source) => {
                    warn!("Attempt {} failed for {}: {}", attempt, url, source);
                    last_error = Some(FetchError::Network {
                        url: url.to_string(),
                        source,
                    });
                    if attempt < max_attempts {
                        sleep(Duration::from_secs(2_u64.pow(attempt - 1))).await;
                    }
                    continue;
                }
            };

            let status = response.status();
            if status.is_success() {
                let final_url = response.url().to_string();
                match response.text().await {
                    Ok(body) => {
                        debug!("Fetched {} ({} chars)", final_url, body.len());
                        return Ok(FetchedPage {
                            url: final_url,
                            status: status.as_u16(),
                            body,
                        });
                    }
                    Err(source) => {
                        warn!("Failed to read body from {}: {}", url, source);
                        last_error = Some(FetchError::Body {
                            url: url.to_string(),
                            source,
                        });
                        if attempt < max_attempts {
                            sleep(Duration::from_secs(2_u64.pow(attempt - 1))).await;
                        }
                        continue;
                    }
                }
            }

            warn!("HTTP error {} on attempt {}: {}", status, attempt, url);
            let retry_after = retry_after_seconds(response.headers());
            last_error = Some(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });

            if self.is_retryable(status) && attempt < max_attempts {
                // Respect Retry-After when the server sends one.
                let mut delay_secs = 2_u64.pow(attempt - 1);
                if let Some(parsed) = retry_after {
                    delay_secs = parsed.max(delay_secs);
                }
                sleep(Duration::from_secs(delay_secs)).await;
            } else {
                break;
            }
        }

        Err(last_error.unwrap_or(FetchError::Status {
            status: 0,
            url: url.to_string(),
        }))
    }
}

/// Read a Retry-After header value in seconds, if present and numeric.
fn retry_after_seconds(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::config::CrawlerConfig;

    #[test]
    fn fetcher_builds_from_default_config() {
        let fetcher = HttpFetcher::new(CrawlerConfig::default());
        assert!(fetcher.is_ok());
    }

    #[test]
    fn user_agent_rotation_stays_in_pool() {
        let config = CrawlerConfig::default();
        let pool = config.user_agents.clone();
        let fetcher = HttpFetcher::new(config).unwrap();
        for _ in 0..20 {
            let ua = fetcher.pick_user_agent();
            assert!(pool.iter().any(|p| p == ua));
        }
    }

    #[test]
    fn zero_delay_still_builds() {
        let config = CrawlerConfig {
            download_delay_ms: 0,
            ..Default::default()
        };
        assert!(HttpFetcher::new(config).is_ok());
    }

    #[tokio::test]
    async fn multi_second_delay_spaces_requests_by_full_period() {
        let config = CrawlerConfig {
            download_delay_ms: 1500,
            randomize_delay: false,
            ..Default::default()
        };
        let fetcher = HttpFetcher::new(config).unwrap();

        assert!(fetcher.rate_limiter.check().is_ok());
        // No second permit before the configured delay has elapsed, even
        // past the one-second mark.
        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert!(fetcher.rate_limiter.check().is_err());
    }

    #[test]
    fn retryable_statuses_follow_config() {
        let fetcher = HttpFetcher::new(CrawlerConfig::default()).unwrap();
        assert!(fetcher.is_retryable(StatusCode::SERVICE_UNAVAILABLE));
        assert!(fetcher.is_retryable(StatusCode::REQUEST_TIMEOUT));
        assert!(!fetcher.is_retryable(StatusCode::NOT_FOUND));
    }
}
