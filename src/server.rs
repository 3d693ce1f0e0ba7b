//! HTTP API
//!
//! Thin axum layer over the scraper and the search driver. All real work
//! happens in [`PageScraper`] and [`WebSearch`]; handlers only translate
//! requests and errors.

use axum::{
    Router,
    extract::{Json, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::Config;
use crate::compose::{Format, ScrapeDocument};
use crate::pipeline::{PageScraper, WebScraper};
use crate::web_search::WebSearch;

#[derive(Clone)]
pub struct AppState {
    scraper: Arc<dyn PageScraper>,
    search: Arc<WebSearch>,
}

impl AppState {
    pub fn new(scraper: Arc<dyn PageScraper>, search: Arc<WebSearch>) -> Self {
        Self { scraper, search }
    }

    /// One scraper shared by both endpoints, so the worker pool bound is global
    pub fn from_config(config: &Config) -> Self {
        let scraper: Arc<dyn PageScraper> = Arc::new(WebScraper::from_config(config));
        let search = Arc::new(WebSearch::from_config(config, scraper.clone()));
        Self::new(scraper, search)
    }
}

#[derive(Debug, Deserialize)]
pub struct ScrapeRequest {
    pub url: String,
    #[serde(default)]
    pub formats: Option<Vec<Format>>,
}

impl ScrapeRequest {
    /// Requested formats, all of them when none are named
    pub fn formats(&self) -> Vec<Format> {
        match &self.formats {
            Some(formats) if !formats.is_empty() => formats.clone(),
            _ => Format::DEFAULT.to_vec(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ScrapeResponse {
    pub success: bool,
    pub url: String,
    pub data: ScrapeDocument,
}

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default)]
    pub max_results: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub success: bool,
    pub query: String,
    pub results_count: usize,
    pub data: Vec<ScrapeDocument>,
}

/// Error body `{"detail": ...}` with its status
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

/// Router with permissive CORS and request tracing
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/scrape", post(scrape_handler))
        .route("/search", post(search_handler))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn root_handler() -> impl IntoResponse {
    Json(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "scrape": "POST /scrape",
            "search": "POST /search",
            "health": "GET /health"
        }
    }))
}

async fn health_handler() -> impl IntoResponse {
    Json(json!({ "status": "healthy" }))
}

async fn scrape_handler(
    State(state): State<AppState>,
    Json(request): Json<ScrapeRequest>,
) -> Result<Json<ScrapeResponse>, ApiError> {
    let formats = request.formats();
    match state.scraper.scrape(&request.url, &formats).await {
        Ok(data) => Ok(Json(ScrapeResponse {
            success: true,
            url: request.url,
            data,
        })),
        Err(e) if e.is_invalid_url() => Err(ApiError::new(StatusCode::UNPROCESSABLE_ENTITY, e.to_string())),
        Err(e) => {
            warn!("{}", e);
            Err(ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}

async fn search_handler(
    State(state): State<AppState>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, ApiError> {
    let results = state
        .search
        .search(&request.query, request.max_results)
        .await
        .map_err(|e| {
            warn!("{}", e);
            ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?;

    Ok(Json(SearchResponse {
        success: true,
        query: results.query.clone(),
        results_count: results.results_count(),
        data: results.results,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::compose;
    use crate::extract::ContentExtractor;
    use crate::pipeline::parse_target;
    use crate::utils::ScrapeError;
    use crate::web_search::SearchConfig;
    use async_trait::async_trait;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use serde_json::Value;
    use tower::ServiceExt;

    /// Serves a fixed page for every valid URL except `blocked.example`
    struct FixedScraper;

    #[async_trait]
    impl PageScraper for FixedScraper {
        async fn scrape(&self, url: &str, formats: &[Format]) -> Result<ScrapeDocument, ScrapeError> {
            let target = parse_target(url)?;
            if target.host_str() == Some("blocked.example") {
                return Err(ScrapeError::Fetch {
                    url: url.to_string(),
                    source: crate::escalation::EscalationError::ChallengeUnresolved {
                        attempts: Vec::new(),
                    },
                });
            }
            let html = "<title>Hi</title><body><main><p>Hello world this is content</p></main></body>";
            Ok(compose(&target, html, formats, &ContentExtractor::default()))
        }
    }

    fn app() -> Router {
        let scraper: Arc<dyn PageScraper> = Arc::new(FixedScraper);
        let search = Arc::new(WebSearch::new(
            SearchConfig {
                endpoint: "http://127.0.0.1:9/html/".to_string(),
                timeout_secs: 2,
                ..SearchConfig::default()
            },
            "test-agent",
            "en",
            scraper.clone(),
        ));
        router(AppState::new(scraper, search))
    }

    async fn call(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn post(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn health_reports_healthy() {
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let (status, body) = call(app(), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "status": "healthy" }));
    }

    #[tokio::test]
    async fn root_lists_endpoints() {
        let request = Request::builder().uri("/").body(Body::empty()).unwrap();
        let (status, body) = call(app(), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "allscrape");
        assert_eq!(body["endpoints"]["scrape"], "POST /scrape");
    }

    #[tokio::test]
    async fn scrape_returns_document() {
        let (status, body) = call(
            app(),
            post("/scrape", json!({ "url": "https://example.com/", "formats": ["text"] })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["url"], "https://example.com/");
        assert_eq!(body["data"]["content"], json!({ "text": "Hello world this is content" }));
        assert_eq!(body["data"]["llm_summary"]["word_count"], 5);
        assert_eq!(body["data"]["metadata"]["author"], "");
    }

    #[tokio::test]
    async fn scrape_defaults_to_all_formats() {
        let (status, body) = call(app(), post("/scrape", json!({ "url": "https://example.com/" }))).await;
        assert_eq!(status, StatusCode::OK);
        let content = body["data"]["content"].as_object().unwrap();
        assert_eq!(content.len(), 3);
        assert!(content.contains_key("html"));
    }

    #[tokio::test]
    async fn invalid_url_is_unprocessable() {
        let (status, body) = call(app(), post("/scrape", json!({ "url": "ftp://example.com" }))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["detail"].as_str().unwrap().starts_with("Failed to scrape ftp://example.com"));
    }

    #[tokio::test]
    async fn unknown_format_is_rejected() {
        let request = post("/scrape", json!({ "url": "https://example.com/", "formats": ["pdf"] }));
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn scrape_failure_is_server_error() {
        let (status, body) = call(app(), post("/scrape", json!({ "url": "https://blocked.example/" }))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(
            body["detail"]
                .as_str()
                .unwrap()
                .starts_with("Failed to scrape https://blocked.example/: challenge could not be bypassed")
        );
    }

    #[tokio::test]
    async fn unreachable_search_page_is_server_error() {
        let (status, body) = call(app(), post("/search", json!({ "query": "rust" }))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["detail"].as_str().unwrap().starts_with("Search failed"));
    }
}
