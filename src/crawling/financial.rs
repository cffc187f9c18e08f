//! Financial statements spider
//!
//! Fetches a ticker's financial-statements listing, turns each statement
//! table into nested records grouped by section heading, normalizes
//! pt-BR formatted numbers, and optionally enriches the record with quote
//! provider data. Structural problems degrade into the output record; only
//! fetch failures propagate.

use crate::domain::{Record, SpiderConfig, Value};
use crate::infrastructure::fetcher::{FetchError, PageFetcher};
use crate::infrastructure::quotes::{HistoricalBar, ProviderError, QuoteProvider};
use scraper::{ElementRef, Html, Selector};
use tracing::{info, warn};

const NO_STATEMENTS_INFO: &str = "No financial statements found for this ticker";

/// Statements listing URL for a ticker.
pub fn statements_url(ticker: &str) -> String {
    format!(
        "https://www.investsite.com.br/atualizacoes_demonstracoes_financeiras.php?cod_negociacao={}",
        ticker.to_uppercase()
    )
}

/// Run the financial pipeline for one ticker, producing a single record.
pub async fn crawl(
    fetcher: &dyn PageFetcher,
    provider: &dyn QuoteProvider,
    ticker: &str,
    config: &SpiderConfig,
) -> Result<Vec<Record>, FetchError> {
    let url = statements_url(ticker);
    let page = fetcher.fetch(&url).await?;
    info!("Processing statements page: {}", page.url);

    let mut record = parse_statements_page(&page.url, &page.body);

    if config.include_quote_data {
        attach_quote_data(&mut record, provider, ticker, config.period_years()).await;
    }

    Ok(vec![record])
}

/// Parse the statements listing into a record.
///
/// Tables without a preceding `h4` heading cannot be attributed to a
/// section and are skipped. Row cells are kept raw under their header keys;
/// normalization only applies to the period-aligned historical index.
pub fn parse_statements_page(url: &str, body: &str) -> Record {
    let html = Html::parse_document(body);
    let table_selector = Selector::parse("table.table").expect("static selector");
    let th_selector = Selector::parse("th").expect("static selector");
    let tr_selector = Selector::parse("tr").expect("static selector");
    let td_selector = Selector::parse("td").expect("static selector");

    let mut financials = Record::new();
    let mut historical = Record::new();
    let mut periods: Vec<String> = Vec::new();

    let tables: Vec<ElementRef> = html.select(&table_selector).collect();
    if !tables.is_empty() {
        if let Some(company) = first_text(&html, "h2") {
            financials.insert("empresa", Value::Text(company));
        }

        for table in tables {
            let section = match preceding_section_heading(table) {
                Some(section) => section,
                None => continue,
            };

            let headers: Vec<String> = table
                .select(&th_selector)
                .map(element_text)
                .filter(|text| !text.is_empty())
                .collect();

            // First header is the metric label, the rest are periods.
            if headers.len() > 1 {
                periods = headers[1..].to_vec();
            }

            financials.insert(section.clone(), Value::Rows(Vec::new()));

            for row in table.select(&tr_selector).skip(1) {
                let cells: Vec<String> = row.select(&td_selector).map(element_text).collect();
                if cells.is_empty() {
                    continue;
                }

                let row_record: Record = headers
                    .iter()
                    .zip(cells.iter())
                    .map(|(header, cell)| (header.clone(), Value::Text(cell.clone())))
                    .collect();

                if let Some(Value::Rows(rows)) = financials.get_mut(&section) {
                    rows.push(row_record);
                }

                let metric = cells[0].clone();
                let mut by_period = Record::new();
                for (i, period) in periods.iter().enumerate() {
                    if let Some(cell) = cells.get(i + 1) {
                        by_period.insert(period.clone(), normalize_numeric(cell));
                    }
                }
                // Duplicate metric labels across sections keep the first
                // occurrence.
                if !historical.contains_key(&metric) {
                    historical.insert(metric, Value::Map(by_period));
                }
            }
        }
    }

    if financials.is_empty() {
        let mut record = Record::new();
        record.insert("url", Value::from(url));
        record.insert("info", Value::from(NO_STATEMENTS_INFO));
        return record;
    }

    financials.insert("url", Value::from(url));
    if !historical.is_empty() {
        financials.insert("dados_historicos", Value::Map(historical));
        financials.insert("periodos", Value::List(periods));
    }
    financials
}

/// Normalize a locale-formatted numeric cell.
///
/// Values with a decimal comma are read as pt-BR ("." groups thousands,
/// "," marks decimals); values without one are parsed as-is, which keeps
/// normalization idempotent on already-normalized input. Unparseable
/// values stay as trimmed text.
pub fn normalize_numeric(raw: &str) -> Value {
    let trimmed = raw.trim();
    if trimmed.contains(',') {
        let candidate = trimmed.replace('.', "").replace(',', ".");
        if let Ok(number) = candidate.parse::<f64>() {
            return Value::Number(number);
        }
    } else if let Ok(number) = trimmed.parse::<f64>() {
        return Value::Number(number);
    }
    Value::Text(trimmed.to_string())
}

/// Nearest `h4` heading before the table, among its preceding siblings.
fn preceding_section_heading(table: ElementRef) -> Option<String> {
    table
        .prev_siblings()
        .filter_map(ElementRef::wrap)
        .find(|element| element.value().name() == "h4")
        .map(|element| element_text(element))
        .filter(|text| !text.is_empty())
}

async fn attach_quote_data(
    record: &mut Record,
    provider: &dyn QuoteProvider,
    ticker: &str,
    years: u32,
) {
    match build_quote_section(provider, ticker, years).await {
        Ok(section) => record.insert("yfinance", Value::Map(section)),
        Err(error) => {
            warn!("Quote provider failed for {}: {}", ticker, error);
            record.insert("quote_error", Value::Text(error.to_string()));
        }
    }
}

async fn build_quote_section(
    provider: &dyn QuoteProvider,
    ticker: &str,
    years: u32,
) -> Result<Record, ProviderError> {
    let profile = provider.company_profile(ticker).await?;
    let bars = provider.price_history(ticker, years).await?;

    let mut section = Record::new();
    if let Some(name) = profile.name {
        section.insert("name", Value::Text(name));
    }
    if let Some(sector) = profile.sector {
        section.insert("sector", Value::Text(sector));
    }
    if let Some(industry) = profile.industry {
        section.insert("industry", Value::Text(industry));
    }
    if let Some(price) = profile.current_price {
        section.insert("current_price", Value::Number(price));
    }
    if let Some(low) = profile.fifty_two_week_low {
        section.insert("fifty_two_week_low", Value::Number(low));
    }
    if let Some(high) = profile.fifty_two_week_high {
        section.insert("fifty_two_week_high", Value::Number(high));
    }
    if let Some(cap) = profile.market_cap {
        section.insert("market_cap", Value::Number(cap));
    }
    if let Some(pe) = profile.pe_ratio {
        section.insert("pe_ratio", Value::Number(pe));
    }
    if let Some(pb) = profile.pb_ratio {
        section.insert("pb_ratio", Value::Number(pb));
    }

    section.insert("requested_years", Value::Number(years as f64));
    if let (Some(first), Some(last)) = (bars.first(), bars.last()) {
        let days = (last.date - first.date).num_days();
        section.insert("period_days", Value::Number(days as f64));
        section.insert(
            "period_years",
            Value::Number(round2(days as f64 / 365.25)),
        );
    }
    section.insert(
        "history",
        Value::Rows(bars.iter().map(bar_record).collect()),
    );

    Ok(section)
}

fn bar_record(bar: &HistoricalBar) -> Record {
    let mut record = Record::new();
    record.insert("date", Value::Text(bar.date.to_string()));
    record.insert("open", Value::Number(round2(bar.open)));
    record.insert("high", Value::Number(round2(bar.high)));
    record.insert("low", Value::Number(round2(bar.low)));
    record.insert("close", Value::Number(round2(bar.close)));
    record.insert("volume", Value::Number(bar.volume as f64));
    record
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn element_text(element: ElementRef) -> String {
    element.text().collect::<String>().trim().to_string()
}

fn first_text(html: &Html, css: &str) -> Option<String> {
    let selector = Selector::parse(css).ok()?;
    html.select(&selector)
        .map(element_text)
        .find(|text| !text.is_empty())
}
