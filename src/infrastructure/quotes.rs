//! Quote provider collaborator
//!
//! Supplies company metadata and daily price history for a ticker. The
//! production implementation talks to the public Yahoo Finance JSON
//! endpoints (chart for bars, quoteSummary for the profile); the pipeline
//! depends only on the `QuoteProvider` trait, and any provider failure is
//! absorbed into the output record rather than failing the job.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Company metadata for one ticker. Every field is optional; the provider
/// returns whatever the upstream knows.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompanyProfile {
    pub name: Option<String>,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub current_price: Option<f64>,
    pub fifty_two_week_low: Option<f64>,
    pub fifty_two_week_high: Option<f64>,
    pub market_cap: Option<f64>,
    pub pe_ratio: Option<f64>,
    pub pb_ratio: Option<f64>,
}

/// One daily price bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("quote request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected quote payload: {0}")]
    Decode(String),

    #[error("no quote data for ticker {0}")]
    NoData(String),
}

/// External collaborator returning ticker metadata and price history.
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    async fn company_profile(&self, ticker: &str) -> Result<CompanyProfile, ProviderError>;

    /// Daily bars covering the last `years` years, ordered by date ascending.
    async fn price_history(
        &self,
        ticker: &str,
        years: u32,
    ) -> Result<Vec<HistoricalBar>, ProviderError>;
}

/// Quote provider backed by the public Yahoo Finance JSON API.
pub struct YahooQuoteProvider {
    client: Client,
    base_url: String,
}

impl YahooQuoteProvider {
    pub fn new() -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("Mozilla/5.0 (compatible; GlobalInsights/1.0)")
            .build()?;
        Ok(Self {
            client,
            base_url: "https://query1.finance.yahoo.com".to_string(),
        })
    }
}

#[async_trait]
impl QuoteProvider for YahooQuoteProvider {
    async fn company_profile(&self, ticker: &str) -> Result<CompanyProfile, ProviderError> {
        let url = format!(
            "{}/v10/finance/quoteSummary/{}?modules=assetProfile,price,summaryDetail,defaultKeyStatistics",
            self.base_url, ticker
        );
        debug!("Fetching company profile: {}", url);

        let payload: QuoteSummaryEnvelope = self.client.get(&url).send().await?.json().await?;
        let result = payload
            .quote_summary
            .and_then(|qs| qs.result)
            .and_then(|mut results| {
                if results.is_empty() {
                    None
                } else {
                    Some(results.remove(0))
                }
            })
            .ok_or_else(|| ProviderError::NoData(ticker.to_string()))?;

        Ok(result.into_profile())
    }

    async fn price_history(
        &self,
        ticker: &str,
        years: u32,
    ) -> Result<Vec<HistoricalBar>, ProviderError> {
        let url = format!(
            "{}/v8/finance/chart/{}?range={}y&interval=1d",
            self.base_url, ticker, years
        );
        debug!("Fetching price history: {}", url);

        let payload: ChartEnvelope = self.client.get(&url).send().await?.json().await?;
        let result = payload
            .chart
            .and_then(|c| c.result)
            .and_then(|mut results| {
                if results.is_empty() {
                    None
                } else {
                    Some(results.remove(0))
                }
            })
            .ok_or_else(|| ProviderError::NoData(ticker.to_string()))?;

        let bars = result.into_bars();
        if bars.is_empty() {
            return Err(ProviderError::NoData(ticker.to_string()));
        }
        Ok(bars)
    }
}

// --- Yahoo response models -------------------------------------------------

#[derive(Debug, Deserialize)]
struct QuoteSummaryEnvelope {
    #[serde(rename = "quoteSummary")]
    quote_summary: Option<QuoteSummary>,
}

#[derive(Debug, Deserialize)]
struct QuoteSummary {
    result: Option<Vec<QuoteSummaryResult>>,
}

#[derive(Debug, Deserialize, Default)]
struct QuoteSummaryResult {
    #[serde(rename = "assetProfile", default)]
    asset_profile: Option<AssetProfile>,
    #[serde(default)]
    price: Option<PriceModule>,
    #[serde(rename = "summaryDetail", default)]
    summary_detail: Option<SummaryDetail>,
    #[serde(rename = "defaultKeyStatistics", default)]
    key_statistics: Option<KeyStatistics>,
}

#[derive(Debug, Deserialize, Default)]
struct AssetProfile {
    sector: Option<String>,
    industry: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct PriceModule {
    #[serde(rename = "longName")]
    long_name: Option<String>,
    #[serde(rename = "shortName")]
    short_name: Option<String>,
    #[serde(rename = "regularMarketPrice")]
    regular_market_price: Option<RawValue>,
    #[serde(rename = "marketCap")]
    market_cap: Option<RawValue>,
}

#[derive(Debug, Deserialize, Default)]
struct SummaryDetail {
    #[serde(rename = "fiftyTwoWeekLow")]
    fifty_two_week_low: Option<RawValue>,
    #[serde(rename = "fiftyTwoWeekHigh")]
    fifty_two_week_high: Option<RawValue>,
    #[serde(rename = "trailingPE")]
    trailing_pe: Option<RawValue>,
}

#[derive(Debug, Deserialize, Default)]
struct KeyStatistics {
    #[serde(rename = "priceToBook")]
    price_to_book: Option<RawValue>,
}

/// Yahoo wraps numbers as `{"raw": 12.3, "fmt": "12.30"}`.
#[derive(Debug, Deserialize, Default)]
struct RawValue {
    raw: Option<f64>,
}

impl QuoteSummaryResult {
    fn into_profile(self) -> CompanyProfile {
        let price = self.price.unwrap_or_default();
        let profile = self.asset_profile.unwrap_or_default();
        let detail = self.summary_detail.unwrap_or_default();
        let stats = self.key_statistics.unwrap_or_default();

        CompanyProfile {
            name: price.long_name.or(price.short_name),
            sector: profile.sector,
            industry: profile.industry,
            current_price: price.regular_market_price.and_then(|v| v.raw),
            fifty_two_week_low: detail.fifty_two_week_low.and_then(|v| v.raw),
            fifty_two_week_high: detail.fifty_two_week_high.and_then(|v| v.raw),
            market_cap: price.market_cap.and_then(|v| v.raw),
            pe_ratio: detail.trailing_pe.and_then(|v| v.raw),
            pb_ratio: stats.price_to_book.and_then(|v| v.raw),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: Option<Chart>,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Option<Indicators>,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteArrays>,
}

#[derive(Debug, Deserialize, Default)]
struct QuoteArrays {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<u64>>,
}

impl ChartResult {
    /// Flatten parallel arrays into bars, dropping days with missing values
    /// (market holidays come back as nulls).
    fn into_bars(self) -> Vec<HistoricalBar> {
        let quote = match self.indicators.and_then(|i| i.quote.into_iter().next()) {
            Some(quote) => quote,
            None => return Vec::new(),
        };

        let mut bars = Vec::with_capacity(self.timestamp.len());
        for (i, ts) in self.timestamp.iter().enumerate() {
            let date = match DateTime::<Utc>::from_timestamp(*ts, 0) {
                Some(dt) => dt.date_naive(),
                None => continue,
            };
            let (open, high, low, close) = match (
                quote.open.get(i).copied().flatten(),
                quote.high.get(i).copied().flatten(),
                quote.low.get(i).copied().flatten(),
                quote.close.get(i).copied().flatten(),
            ) {
                (Some(o), Some(h), Some(l), Some(c)) => (o, h, l, c),
                _ => continue,
            };
            let volume = quote.volume.get(i).copied().flatten().unwrap_or(0);
            bars.push(HistoricalBar {
                date,
                open,
                high,
                low,
                close,
                volume,
            });
        }
        bars.sort_by_key(|bar| bar.date);
        bars
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chart_result_flattens_and_skips_null_days() {
        let payload = r#"{
            "chart": {"result": [{
                "timestamp": [1704153600, 1704240000, 1704326400],
                "indicators": {"quote": [{
                    "open":   [10.0, null, 11.0],
                    "high":   [10.5, null, 11.5],
                    "low":    [9.5,  null, 10.5],
                    "close":  [10.2, null, 11.2],
                    "volume": [1000, null, 2000]
                }]}
            }], "error": null}
        }"#;
        let envelope: ChartEnvelope = serde_json::from_str(payload).unwrap();
        let result = envelope.chart.unwrap().result.unwrap().remove(0);
        let bars = result.into_bars();

        assert_eq!(bars.len(), 2);
        assert!(bars[0].date < bars[1].date);
        assert_eq!(bars[0].close, 10.2);
        assert_eq!(bars[1].volume, 2000);
    }

    #[test]
    fn quote_summary_maps_wrapped_values() {
        let payload = r#"{
            "quoteSummary": {"result": [{
                "assetProfile": {"sector": "Energy", "industry": "Oil & Gas"},
                "price": {
                    "longName": "Test Corp",
                    "regularMarketPrice": {"raw": 34.57, "fmt": "34.57"},
                    "marketCap": {"raw": 1000000.0}
                },
                "summaryDetail": {
                    "fiftyTwoWeekLow": {"raw": 20.0},
                    "fiftyTwoWeekHigh": {"raw": 40.0},
                    "trailingPE": {"raw": 5.5}
                },
                "defaultKeyStatistics": {"priceToBook": {"raw": 1.2}}
            }], "error": null}
        }"#;
        let envelope: QuoteSummaryEnvelope = serde_json::from_str(payload).unwrap();
        let profile = envelope
            .quote_summary
            .unwrap()
            .result
            .unwrap()
            .remove(0)
            .into_profile();

        assert_eq!(profile.name.as_deref(), Some("Test Corp"));
        assert_eq!(profile.sector.as_deref(), Some("Energy"));
        assert_eq!(profile.current_price, Some(34.57));
        assert_eq!(profile.pb_ratio, Some(1.2));
    }

    #[test]
    fn empty_chart_yields_no_bars() {
        let result = ChartResult {
            timestamp: vec![],
            indicators: None,
        };
        assert!(result.into_bars().is_empty());
    }
}
