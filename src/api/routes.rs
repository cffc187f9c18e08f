//! API routes and handlers
//!
//! Thin request/response mapping over the job manager: validation failures
//! become 400s before any job exists, pipeline failures become 500s (the
//! job record still reflects the failure), unknown job ids become 404s.

use crate::application::{JobError, JobManager};
use crate::domain::{JobId, SpiderConfig};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Html;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub type SharedManager = Arc<JobManager>;

type ApiResult = (StatusCode, Json<JsonValue>);

#[derive(Debug, Deserialize)]
pub struct ScrapeRequest {
    pub url: Option<String>,
    pub config: Option<SpiderConfig>,
}

#[derive(Debug, Deserialize)]
pub struct FinanceRequest {
    pub ticker: Option<String>,
    pub config: Option<SpiderConfig>,
}

/// Build the application router.
pub fn router(manager: SharedManager) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(index))
        .route("/api/scrape", post(scrape))
        .route("/api/finance", post(finance))
        .route("/api/jobs", get(list_jobs))
        .route("/api/results/:job_id", get(get_results))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(manager)
}

async fn index() -> Html<&'static str> {
    Html(LANDING_PAGE)
}

async fn scrape(
    State(manager): State<SharedManager>,
    Json(request): Json<ScrapeRequest>,
) -> ApiResult {
    let url = match request.url.filter(|u| !u.trim().is_empty()) {
        Some(url) => url,
        None => return error_response(StatusCode::BAD_REQUEST, "URL not provided"),
    };
    let config = request.config.unwrap_or_default();

    match manager.run_scrape(&url, &config).await {
        Ok(outcome) => success_response(&outcome),
        Err(error) => error_response(StatusCode::INTERNAL_SERVER_ERROR, &error.to_string()),
    }
}

async fn finance(
    State(manager): State<SharedManager>,
    Json(request): Json<FinanceRequest>,
) -> ApiResult {
    let ticker = match request.ticker.filter(|t| !t.trim().is_empty()) {
        Some(ticker) => ticker,
        None => return error_response(StatusCode::BAD_REQUEST, "Ticker not provided"),
    };
    let config = request.config.unwrap_or_default();

    match manager.run_financial(&ticker, &config).await {
        Ok(outcome) => success_response(&outcome),
        Err(error) => error_response(StatusCode::INTERNAL_SERVER_ERROR, &error.to_string()),
    }
}

async fn list_jobs(State(manager): State<SharedManager>) -> ApiResult {
    let jobs = manager.list_jobs().await;
    (StatusCode::OK, Json(json!({ "jobs": jobs })))
}

async fn get_results(
    State(manager): State<SharedManager>,
    Path(job_id): Path<String>,
) -> ApiResult {
    // A malformed id can never name a known job.
    let job_id: JobId = match job_id.parse() {
        Ok(job_id) => job_id,
        Err(_) => {
            return error_response(StatusCode::NOT_FOUND, &format!("Job ID {job_id} not found"))
        }
    };

    match manager.get_results(job_id).await {
        Ok(results) => (StatusCode::OK, Json(json!({ "results": results }))),
        Err(JobError::NotFound(id)) => {
            error_response(StatusCode::NOT_FOUND, &format!("Job ID {id} not found"))
        }
        Err(error) => error_response(StatusCode::INTERNAL_SERVER_ERROR, &error.to_string()),
    }
}

fn success_response(outcome: &impl serde::Serialize) -> ApiResult {
    (
        StatusCode::OK,
        Json(json!({ "status": "success", "data": outcome })),
    )
}

fn error_response(status: StatusCode, message: &str) -> ApiResult {
    (status, Json(json!({ "error": message })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::fetcher::{FetchError, FetchedPage, PageFetcher};
    use crate::infrastructure::quotes::{
        CompanyProfile, HistoricalBar, ProviderError, QuoteProvider,
    };
    use crate::infrastructure::results_store::ResultsStore;
    use async_trait::async_trait;

    struct OnePageFetcher;

    #[async_trait]
    impl PageFetcher for OnePageFetcher {
        async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
            Ok(FetchedPage {
                url: url.to_string(),
                status: 200,
                body: "<html><head><title>ok</title></head><body></body></html>".to_string(),
            })
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

    async fn test_manager() -> (SharedManager, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = ResultsStore::initialize(dir.path()).await.unwrap();
        let manager = Arc::new(JobManager::new(
            store,
            Arc::new(OnePageFetcher),
            Arc::new(NoQuotes),
        ));
        (manager, dir)
    }

    #[tokio::test]
    async fn scrape_without_url_is_rejected() {
        let (manager, _dir) = test_manager().await;
        let request = ScrapeRequest {
            url: None,
            config: None,
        };
        let (status, Json(body)) = scrape(State(manager), Json(request)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "URL not provided");
    }

    #[tokio::test]
    async fn scrape_with_blank_url_is_rejected() {
        let (manager, _dir) = test_manager().await;
        let request = ScrapeRequest {
            url: Some("   ".to_string()),
            config: None,
        };
        let (status, Json(body)) = scrape(State(manager), Json(request)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "URL not provided");
    }

    #[tokio::test]
    async fn finance_without_ticker_is_rejected() {
        let (manager, _dir) = test_manager().await;
        let request = FinanceRequest {
            ticker: None,
            config: None,
        };
        let (status, Json(body)) = finance(State(manager), Json(request)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Ticker not provided");
    }

    #[tokio::test]
    async fn scrape_success_is_wrapped_in_envelope() {
        let (manager, _dir) = test_manager().await;
        let request = ScrapeRequest {
            url: Some("http://example.test/a".to_string()),
            config: None,
        };
        let (status, Json(body)) = scrape(State(manager), Json(request)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "success");
        assert_eq!(body["data"]["status"], "completed");
        assert!(body["data"]["job_id"].is_string());
        assert_eq!(body["data"]["results"][0]["title"], "ok");
    }

    #[tokio::test]
    async fn results_for_malformed_id_is_not_found() {
        let (manager, _dir) = test_manager().await;
        let (status, Json(body)) =
            get_results(State(manager), Path("not-a-uuid".to_string())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Job ID not-a-uuid not found");
    }

    #[tokio::test]
    async fn results_for_unknown_id_is_not_found() {
        let (manager, _dir) = test_manager().await;
        let missing = "00000000-0000-4000-8000-000000000000";
        let (status, Json(body)) =
            get_results(State(manager), Path(missing.to_string())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], format!("Job ID {missing} not found"));
    }

    #[tokio::test]
    async fn jobs_listing_starts_empty() {
        let (manager, _dir) = test_manager().await;
        let (status, Json(body)) = list_jobs(State(manager)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["jobs"], json!([]));
    }
}

const LANDING_PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <title>Global Insights</title>
</head>
<body>
    <h1>Global Insights</h1>
    <p>Web scraping and financial data extraction API.</p>
    <ul>
        <li><code>POST /api/scrape</code>: {"url": "...", "config": {...}}</li>
        <li><code>POST /api/finance</code>: {"ticker": "...", "config": {...}}</li>
        <li><code>GET /api/jobs</code></li>
        <li><code>GET /api/results/{job_id}</code></li>
    </ul>
</body>
</html>
"#;
