//! Per-job extraction configuration
//!
//! Mirrors the `config` object accepted by the scrape/finance endpoints.
//! Unknown keys are ignored; every option has a default so an empty or
//! missing config is valid.

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Selector descriptor for one extraction field: `{"css": expr}` or
/// `{"xpath": expr}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectorSpec {
    Css(String),
    Xpath(String),
}

/// Extraction spec for one job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpiderConfig {
    /// Field name → selector. Order is preserved so extracted fields appear
    /// in the record in the order the caller configured them.
    #[serde(
        deserialize_with = "deserialize_selectors",
        serialize_with = "serialize_selectors"
    )]
    pub selectors: Vec<(String, SelectorSpec)>,

    /// Follow the first absolute link of each page (linear chain).
    pub follow_links: bool,

    /// Page budget for the crawl; values below 1 are treated as 1.
    pub max_pages: u32,

    /// Price-history span in years; clamped to [1, 15] on access.
    pub period_years: u32,

    /// Enrich financial records with quote-provider data. The legacy
    /// `yfinance_data` key is accepted as an alias.
    #[serde(alias = "yfinance_data")]
    pub include_quote_data: bool,
}

impl Default for SpiderConfig {
    fn default() -> Self {
        Self {
            selectors: Vec::new(),
            follow_links: false,
            max_pages: 1,
            period_years: 5,
            include_quote_data: true,
        }
    }
}

impl SpiderConfig {
    /// Effective page budget (at least one page is always fetched).
    pub fn max_pages(&self) -> u32 {
        self.max_pages.max(1)
    }

    /// Effective history span, clamped to the provider-supported range.
    pub fn period_years(&self) -> u32 {
        self.period_years.clamp(1, 15)
    }

    pub fn has_selectors(&self) -> bool {
        !self.selectors.is_empty()
    }
}

fn serialize_selectors<S>(
    selectors: &[(String, SelectorSpec)],
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    use serde::ser::SerializeMap;
    let mut map = serializer.serialize_map(Some(selectors.len()))?;
    for (field, spec) in selectors {
        map.serialize_entry(field, spec)?;
    }
    map.end()
}

fn deserialize_selectors<'de, D>(deserializer: D) -> Result<Vec<(String, SelectorSpec)>, D::Error>
where
    D: Deserializer<'de>,
{
    struct SelectorsVisitor;

    impl<'de> Visitor<'de> for SelectorsVisitor {
        type Value = Vec<(String, SelectorSpec)>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a map of field name to selector descriptor")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
            let mut fields = Vec::new();
            while let Some((field, spec)) = map.next_entry::<String, SelectorSpec>()? {
                fields.push((field, spec));
            }
            Ok(fields)
        }
    }

    deserializer.deserialize_map(SelectorsVisitor)
}
