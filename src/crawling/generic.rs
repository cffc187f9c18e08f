//! Generic URL spider
//!
//! Drives the fetch → extract → optional link-follow loop for arbitrary
//! pages. The chain is strictly linear: at most one link is followed per
//! page, bounded by the configured page budget, so a crawl never fans out
//! into a tree of requests.

use crate::crawling::selectors::apply_selector;
use crate::domain::{Record, SpiderConfig, Value};
use crate::infrastructure::fetcher::{FetchError, FetchedPage, PageFetcher};
use scraper::{Html, Selector};
use tracing::info;
use url::Url;

const MAX_HEADINGS: usize = 2;
const MAX_PARAGRAPHS: usize = 5;

/// Crawl starting from `seed`, producing one record per visited page in
/// visit order.
pub async fn crawl(
    fetcher: &dyn PageFetcher,
    seed: &str,
    config: &SpiderConfig,
) -> Result<Vec<Record>, FetchError> {
    let max_pages = config.max_pages();
    let mut records = Vec::new();
    let mut visited = 0u32;
    let mut pending = Some(seed.to_string());

    while let Some(url) = pending.take() {
        let page = fetcher.fetch(&url).await?;
        visited += 1;
        info!("Processing page: {} [{}/{}]", page.url, visited, max_pages);

        let follow = config.follow_links && visited < max_pages;
        let (record, next_link) = parse_page(&page, config, follow);
        records.push(record);
        pending = next_link;
    }

    Ok(records)
}

/// Parse one fetched page into a record, plus the next link to follow.
///
/// Synchronous on purpose: the parsed document is dropped before the caller
/// awaits again.
fn parse_page(
    page: &FetchedPage,
    config: &SpiderConfig,
    follow: bool,
) -> (Record, Option<String>) {
    let html = Html::parse_document(&page.body);

    let record = if config.has_selectors() {
        extract_configured_fields(&page.url, &html, config)
    } else {
        extract_page_summary(&page.url, &html)
    };

    let next_link = if follow { first_absolute_link(&html) } else { None };
    (record, next_link)
}

/// Default extraction when no selectors are configured: a short page summary.
fn extract_page_summary(url: &str, html: &Html) -> Record {
    let mut record = Record::new();
    record.insert("url", Value::from(url));

    if let Some(title) = select_texts(html, "title").into_iter().next() {
        record.insert("title", Value::Text(title));
    }

    let headings: Vec<String> = select_texts(html, "h1, h2")
        .into_iter()
        .take(MAX_HEADINGS)
        .collect();
    record.insert("headings", Value::List(headings));

    let paragraphs: Vec<String> = select_texts(html, "p")
        .into_iter()
        .take(MAX_PARAGRAPHS)
        .collect();
    record.insert("paragraphs", Value::List(paragraphs));

    record
}

/// Selector-driven extraction: every configured field collects all matches,
/// in the order the caller configured the fields.
fn extract_configured_fields(url: &str, html: &Html, config: &SpiderConfig) -> Record {
    let mut record = Record::new();
    record.insert("url", Value::from(url));
    for (field, spec) in &config.selectors {
        record.insert(field.clone(), Value::List(apply_selector(html, spec)));
    }
    record
}

/// First absolute http(s) link on the page, in document order.
///
/// Hrefs that do not parse as absolute URLs (relative paths, fragments)
/// and non-http schemes (mailto:, ftp:) are skipped.
fn first_absolute_link(html: &Html) -> Option<String> {
    let selector = Selector::parse("a[href]").ok()?;
    html.select(&selector)
        .filter_map(|element| element.value().attr("href"))
        .filter_map(|href| Url::parse(href).ok())
        .find(|url| matches!(url.scheme(), "http" | "https"))
        .map(String::from)
}

fn select_texts(html: &Html, css: &str) -> Vec<String> {
    let selector = match Selector::parse(css) {
        Ok(selector) => selector,
        Err(_) => return Vec::new(),
    };
    html.select(&selector)
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|text| !text.is_empty())
        .collect()
}
