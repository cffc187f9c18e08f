//! End-to-end job lifecycle tests through the job manager, using canned
//! fetcher and quote-provider collaborators.

use async_trait::async_trait;
use global_insights::application::{JobManager, JobResults};
use global_insights::domain::{JobStatus, SpiderConfig, Value};
use global_insights::infrastructure::fetcher::{FetchError, FetchedPage, PageFetcher};
use global_insights::infrastructure::quotes::{
    CompanyProfile, HistoricalBar, ProviderError, QuoteProvider,
};
use global_insights::infrastructure::results_store::ResultsStore;
use std::collections::HashMap;
use std::sync::Arc;

struct MapFetcher {
    pages: HashMap<String, String>,
}

impl MapFetcher {
    fn new(pages: &[(&str, &str)]) -> Self {
        Self {
            pages: pages
                .iter()
                .map(|(url, body)| (url.to_string(), body.to_string()))
                .collect(),
        }
    }
}

#[async_trait]
impl PageFetcher for MapFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        match self.pages.get(url) {
            Some(body) => Ok(FetchedPage {
                url: url.to_string(),
                status: 200,
                body: body.clone(),
            }),
            None => Err(FetchError::Status {
                status: 404,
                url: url.to_string(),
            }),
        }
    }
}

struct NoQuotes;

#[async_trait]
impl QuoteProvider for NoQuotes {
    async fn company_profile(&self, ticker: &str) -> Result<CompanyProfile, ProviderError> {
        Err(ProviderError::NoData(ticker.to_string()))
    }

    async fn price_history(
        &self,
        ticker: &str,
        _years: u32,
    ) -> Result<Vec<HistoricalBar>, ProviderError> {
        Err(ProviderError::NoData(ticker.to_string()))
    }
}

async fn build_manager(
    pages: &[(&str, &str)],
) -> (JobManager, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let store = ResultsStore::initialize(dir.path()).await.unwrap();
    let manager = JobManager::new(store, Arc::new(MapFetcher::new(pages)), Arc::new(NoQuotes));
    (manager, dir)
}

#[tokio::test]
async fn follow_links_chain_produces_records_in_visit_order() {
    let page_a = r#"<html><head><title>Page A</title></head><body>
        <a href="http://example.test/b">to b</a>
    </body></html>"#;
    let page_b = r#"<html><head><title>Page B</title></head><body>
        <p>no links here</p>
    </body></html>"#;
    let (manager, _dir) = build_manager(&[
        ("http://example.test/a", page_a),
        ("http://example.test/b", page_b),
    ])
    .await;

    let config: SpiderConfig =
        serde_json::from_str(r#"{"follow_links": true, "max_pages": 2}"#).unwrap();
    let outcome = manager
        .run_scrape("http://example.test/a", &config)
        .await
        .unwrap();

    assert_eq!(outcome.status, JobStatus::Completed);
    assert_eq!(outcome.results.len(), 2);
    assert_eq!(
        outcome.results[0].get("url").and_then(Value::as_text),
        Some("http://example.test/a")
    );
    assert_eq!(
        outcome.results[1].get("url").and_then(Value::as_text),
        Some("http://example.test/b")
    );

    // The persisted sequence matches what the run returned.
    match manager.get_results(outcome.job_id).await.unwrap() {
        JobResults::Records(records) => assert_eq!(records, outcome.results),
        JobResults::Pending { .. } => panic!("job should be completed"),
    }
}

#[tokio::test]
async fn financial_job_without_quote_data_has_no_quote_keys() {
    let page = r#"<html><body>
        <h4>Balance Sheet</h4>
        <table class="table">
            <tr><th>Conta</th><th>2022</th><th>2023</th></tr>
            <tr><td>Revenue</td><td>100.000,00</td><td>120.000,00</td></tr>
        </table>
    </body></html>"#;
    let url =
        "https://www.investsite.com.br/atualizacoes_demonstracoes_financeiras.php?cod_negociacao=XYZ1";
    let (manager, _dir) = build_manager(&[(url, page)]).await;

    let config: SpiderConfig =
        serde_json::from_str(r#"{"include_quote_data": false}"#).unwrap();
    let outcome = manager.run_financial("XYZ1", &config).await.unwrap();

    let record = &outcome.results[0];
    let rows = record.get("Balance Sheet").unwrap().as_rows().unwrap();
    assert_eq!(rows[0].get("2022").and_then(Value::as_text), Some("100.000,00"));
    assert!(record.get("yfinance").is_none());
    assert!(record.get("quote_error").is_none());
    assert_eq!(record.get("url").and_then(Value::as_text), Some(url));
}

#[tokio::test]
async fn every_submission_reaches_exactly_one_terminal_status() {
    let (manager, _dir) =
        build_manager(&[("http://example.test/ok", "<html><body></body></html>")]).await;

    let _ = manager
        .run_scrape("http://example.test/ok", &SpiderConfig::default())
        .await
        .unwrap();
    let _ = manager
        .run_scrape("http://example.test/missing", &SpiderConfig::default())
        .await
        .unwrap_err();

    let jobs = manager.list_jobs().await;
    assert_eq!(jobs.len(), 2);
    for job in jobs {
        assert!(matches!(
            job.status,
            JobStatus::Completed | JobStatus::Failed
        ));
        assert!(job.finished_at.is_some());
        assert_eq!(job.status == JobStatus::Failed, job.error.is_some());
    }
}

#[tokio::test]
async fn results_for_unknown_job_fail_with_not_found() {
    let (manager, _dir) = build_manager(&[]).await;
    let missing = "00000000-0000-4000-8000-000000000000".parse().unwrap();
    let error = manager.get_results(missing).await.unwrap_err();
    assert!(error.to_string().contains("not found"));
}

#[tokio::test]
async fn concurrent_submissions_are_tracked_independently() {
    let page = "<html><head><title>shared</title></head><body></body></html>";
    let (manager, _dir) = build_manager(&[("http://example.test/a", page)]).await;
    let manager = Arc::new(manager);

    let mut handles = Vec::new();
    for _ in 0..4 {
        let manager = Arc::clone(&manager);
        handles.push(tokio::spawn(async move {
            manager
                .run_scrape("http://example.test/a", &SpiderConfig::default())
                .await
                .unwrap()
        }));
    }

    let mut job_ids = Vec::new();
    for handle in handles {
        let outcome = handle.await.unwrap();
        assert_eq!(outcome.status, JobStatus::Completed);
        job_ids.push(outcome.job_id);
    }

    job_ids.sort_by_key(|id| id.to_string());
    job_ids.dedup();
    assert_eq!(job_ids.len(), 4, "job ids must be unique");
    assert_eq!(manager.list_jobs().await.len(), 4);
}
