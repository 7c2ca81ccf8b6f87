//! HTTP request handlers

use super::state::AppState;
use crate::error::SearchError;
use crate::providers::SearchType;
use crate::search::{SearchRequest, DEFAULT_COUNT};
use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tracing::{info_span, Instrument};
use uuid::Uuid;

/// Error body returned by every endpoint: `{"error": "<message>"}`
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<SearchError> for ApiError {
    fn from(err: SearchError) -> Self {
        let status = match &err {
            SearchError::InvalidRequest(_)
            | SearchError::NoProviders(_)
            | SearchError::ProviderUnavailable { .. } => StatusCode::BAD_REQUEST,
            SearchError::AllQueriesFailed(_) => StatusCode::BAD_GATEWAY,
            SearchError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

/// Search handler (JSON body)
pub async fn search(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = body.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let request = SearchRequest::from_json(body)?;
    run_search(state, request).await
}

/// Query parameters for the single-query GET form of search
#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
    #[serde(rename = "type")]
    pub search_type: Option<String>,
    pub provider: Option<String>,
    pub count: Option<u32>,
}

/// Search handler (`GET /search?q=...`)
pub async fn search_get(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Response, ApiError> {
    let query = params
        .q
        .filter(|q| !q.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("missing required parameter 'q'"))?;
    let search_type: SearchType = params
        .search_type
        .as_deref()
        .unwrap_or_default()
        .parse()
        .map_err(ApiError::bad_request)?;

    let mut request = SearchRequest::new([query])
        .with_type(search_type)
        .with_count(params.count.unwrap_or(DEFAULT_COUNT));
    if let Some(provider) = params.provider {
        request = request.with_provider(provider);
    }

    run_search(state, request).await
}

async fn run_search(state: AppState, request: SearchRequest) -> Result<Response, ApiError> {
    // Dropping the guard cancels in-flight work when the client goes away
    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();

    let span = info_span!(
        "search",
        request_id = %Uuid::new_v4(),
        search_type = %request.search_type
    );

    let response = state
        .search
        .execute(&request, &cancel)
        .instrument(span)
        .await?;

    Ok(Json(response).into_response())
}

/// Provider listing
pub async fn providers(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.search.describe())
}

/// Statistics handler
pub async fn stats(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "instance_name": state.instance_name(),
        "metrics": state.metrics.snapshot(),
    }))
}

/// Health check endpoint
pub async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": crate::VERSION
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::error::ProviderError;
    use crate::providers::{Provider, ProviderRegistry};
    use crate::results::SearchResult;
    use crate::search::SearchQuery;
    use crate::web::create_router;
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use std::sync::Arc;
    use tower::ServiceExt;

    /// Answers web queries, fails for any query containing "fail"
    struct Mock;

    #[async_trait]
    impl Provider for Mock {
        fn name(&self) -> &str {
            "mock"
        }

        fn supported_types(&self) -> &[SearchType] {
            &[SearchType::Web]
        }

        fn is_available(&self) -> bool {
            true
        }

        async fn search(
            &self,
            _search_type: SearchType,
            query: &SearchQuery,
            _cancel: &CancellationToken,
        ) -> Result<Vec<SearchResult>, ProviderError> {
            if query.query.contains("fail") {
                return Err(ProviderError::Http {
                    status: 500,
                    message: "upstream down".into(),
                });
            }
            Ok(vec![SearchResult::new(query.query.clone(), "https://mock.example")])
        }
    }

    fn app() -> axum::Router {
        let registry = ProviderRegistry::new().with(Arc::new(Mock));
        create_router(AppState::new(Settings::default(), registry, None))
    }

    async fn call(request: Request<Body>) -> (StatusCode, Value) {
        let response = app().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn post(body: &str) -> Request<Body> {
        Request::post("/search")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = call(Request::get("/health").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_post_search() {
        let (status, body) = call(post(r#"{"query": ["rust", "fail me"]}"#)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["summary"]["total"], 2);
        assert_eq!(body["summary"]["failed"], 1);
        assert_eq!(body["searches"][0]["provider"], "mock");
        assert_eq!(body["searches"][0]["error"], "");
        assert!(body["searches"][1]["error"]
            .as_str()
            .unwrap()
            .starts_with("search failed: mock: HTTP error 500"));
    }

    #[tokio::test]
    async fn test_invalid_request() {
        let (status, body) = call(post(r#"{"query": []}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("cannot be empty"));

        let (status, _) = call(post("not json")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unservable_type() {
        let (status, body) = call(post(r#"{"type": "image", "query": ["cats"]}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body["error"],
            "no available providers support search type: image"
        );
    }

    #[tokio::test]
    async fn test_all_failed() {
        let (status, body) = call(post(r#"{"query": ["fail one", "fail two"]}"#)).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        let error = body["error"].as_str().unwrap();
        assert!(error.contains("fail one"));
        assert!(error.contains("fail two"));
    }

    #[tokio::test]
    async fn test_get_search() {
        let request = Request::get("/search?q=ferris&count=1").body(Body::empty()).unwrap();
        let (status, body) = call(request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["searches"][0]["results"][0]["title"], "ferris");

        let (status, _) = call(Request::get("/search").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_providers_and_stats() {
        let (status, body) = call(Request::get("/providers").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["default_provider"], "mock");
        assert_eq!(body["search_types"], json!(["web"]));
        assert_eq!(body["providers"][0]["available"], true);

        let (status, body) = call(Request::get("/stats").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["metrics"]["total_requests"], 0);
    }
}
