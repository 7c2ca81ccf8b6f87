//! Search execution and orchestration

use super::aggregator::aggregate;
use super::dispatcher::{Dispatcher, DEFAULT_MAX_PARALLEL};
use super::executor::{QueryExecutor, DEFAULT_FALLBACK_DELAY};
use super::models::SearchRequest;
use super::selector::FallbackSelector;
use crate::config::SearchSettings;
use crate::error::SearchError;
use crate::metrics::Metrics;
use crate::providers::{Provider, ProviderInfo, ProviderRegistry, SearchType};
use crate::results::AggregateResponse;
use crate::security::ContentScanner;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Entry point for multi-query searches across the registered providers
#[derive(Clone)]
pub struct Search {
    registry: Arc<ProviderRegistry>,
    selector: FallbackSelector,
    max_parallel: usize,
    fallback_delay: Duration,
    scanner: Option<Arc<dyn ContentScanner>>,
    metrics: Option<Arc<Metrics>>,
}

/// What the registered providers can currently do
#[derive(Debug, Clone, Serialize)]
pub struct ProvidersDescription {
    pub providers: Vec<ProviderInfo>,
    /// First available provider in priority order
    pub default_provider: Option<String>,
    /// Search types at least one available provider serves
    pub search_types: Vec<SearchType>,
}

impl Search {
    /// Create a search with default parallelism, fallback delay and priority
    pub fn new(registry: Arc<ProviderRegistry>) -> Self {
        Self {
            registry,
            selector: FallbackSelector::default(),
            max_parallel: DEFAULT_MAX_PARALLEL,
            fallback_delay: DEFAULT_FALLBACK_DELAY,
            scanner: None,
            metrics: None,
        }
    }

    /// Apply orchestration settings
    pub fn with_settings(self, settings: &SearchSettings) -> Self {
        self.with_priority(settings.priority_order.clone())
            .with_max_parallel(settings.max_parallel)
            .with_fallback_delay(settings.fallback_base_delay())
    }

    pub fn with_priority(mut self, priority: Vec<String>) -> Self {
        self.selector = FallbackSelector::new(priority);
        self
    }

    /// Set the worker pool size (at least 1)
    pub fn with_max_parallel(mut self, max_parallel: usize) -> Self {
        self.max_parallel = max_parallel.max(1);
        self
    }

    pub fn with_fallback_delay(mut self, delay: Duration) -> Self {
        self.fallback_delay = delay;
        self
    }

    pub fn with_scanner(mut self, scanner: Arc<dyn ContentScanner>) -> Self {
        self.scanner = Some(scanner);
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn registry(&self) -> &Arc<ProviderRegistry> {
        &self.registry
    }

    /// Candidates for a search type, in the order they would be tried
    pub fn candidates(&self, search_type: SearchType, explicit: Option<&str>) -> Vec<Arc<dyn Provider>> {
        self.selector.select(&self.registry, search_type, explicit)
    }

    /// Execute every query of `request` and aggregate the outcomes.
    ///
    /// Fails before any I/O when no provider can serve the request, and with
    /// [`SearchError::Cancelled`] whenever `cancel` fires before the batch
    /// completes.
    pub async fn execute(
        &self,
        request: &SearchRequest,
        cancel: &CancellationToken,
    ) -> Result<AggregateResponse, SearchError> {
        request.validate()?;
        if cancel.is_cancelled() {
            return Err(SearchError::Cancelled);
        }
        if let Some(metrics) = &self.metrics {
            metrics.inc_request();
        }

        let explicit = request.provider.as_deref();
        let candidates = self.candidates(request.search_type, explicit);
        if candidates.is_empty() {
            let err = match explicit {
                Some(name) => SearchError::ProviderUnavailable {
                    provider: name.to_string(),
                    search_type: request.search_type,
                },
                None => SearchError::NoProviders(request.search_type),
            };
            error!("{}", err);
            return Err(err);
        }

        let started = Instant::now();
        info!(
            search_type = %request.search_type,
            queries = request.queries.len(),
            providers = ?candidates.iter().map(|p| p.name()).collect::<Vec<_>>(),
            "Executing search"
        );

        let dispatcher = Dispatcher::new(self.executor(), self.max_parallel);
        let outcomes = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            outcomes = dispatcher.dispatch(
                request.search_type,
                request.search_queries(),
                Arc::from(candidates),
                cancel,
            ) => Some(outcomes),
        };

        let Some(outcomes) = outcomes.filter(|_| !cancel.is_cancelled()) else {
            info!("Search cancelled after {:?}", started.elapsed());
            return Err(SearchError::Cancelled);
        };

        match aggregate(outcomes) {
            Ok(response) => {
                info!(
                    total = response.summary.total,
                    successful = response.summary.successful,
                    failed = response.summary.failed,
                    "Search completed in {:?}",
                    started.elapsed()
                );
                Ok(response)
            }
            Err(err) => {
                error!("{}", err);
                Err(err)
            }
        }
    }

    /// Registered providers, the default one and the servable search types
    pub fn describe(&self) -> ProvidersDescription {
        ProvidersDescription {
            providers: self.registry.describe(),
            default_provider: self
                .registry
                .default_provider(self.selector.priority())
                .map(str::to_string),
            search_types: self.registry.servable_types(),
        }
    }

    fn executor(&self) -> QueryExecutor {
        let mut executor =
            QueryExecutor::new(self.registry.clone()).with_fallback_delay(self.fallback_delay);
        if let Some(scanner) = &self.scanner {
            executor = executor.with_scanner(scanner.clone());
        }
        if let Some(metrics) = &self.metrics {
            executor = executor.with_metrics(metrics.clone());
        }
        executor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use crate::results::SearchResult;
    use crate::search::SearchQuery;
    use async_trait::async_trait;

    struct Echo;

    #[async_trait]
    impl Provider for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        fn supported_types(&self) -> &[SearchType] {
            &[SearchType::Web, SearchType::News]
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
            Ok(vec![SearchResult::new(query.query.clone(), "https://echo.example")])
        }
    }

    fn search() -> Search {
        Search::new(Arc::new(ProviderRegistry::new().with(Arc::new(Echo))))
    }

    #[tokio::test]
    async fn test_execute() {
        let request = SearchRequest::new(["one", "two"]);
        let response = search().execute(&request, &CancellationToken::new()).await.unwrap();

        assert_eq!(response.summary.successful, 2);
        assert_eq!(response.searches[1].results[0].title, "two");
        assert_eq!(response.searches[0].provider.as_deref(), Some("echo"));
    }

    #[tokio::test]
    async fn test_no_providers_for_type() {
        let request = SearchRequest::new(["x"]).with_type(SearchType::Local);
        let err = search().execute(&request, &CancellationToken::new()).await.unwrap_err();
        assert_eq!(err, SearchError::NoProviders(SearchType::Local));
    }

    #[tokio::test]
    async fn test_unknown_explicit_provider() {
        let request = SearchRequest::new(["x"]).with_provider("brave");
        let err = search().execute(&request, &CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, SearchError::ProviderUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_invalid_request() {
        let request = SearchRequest::new(["ok", " "]);
        let err = search().execute(&request, &CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, SearchError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_precancelled() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = search()
            .execute(&SearchRequest::new(["x"]), &cancel)
            .await
            .unwrap_err();
        assert_eq!(err, SearchError::Cancelled);
    }

    #[test]
    fn test_describe() {
        let description = search().describe();
        assert_eq!(description.default_provider.as_deref(), Some("echo"));
        assert_eq!(description.search_types, vec![SearchType::Web, SearchType::News]);
        assert_eq!(description.providers.len(), 1);
    }

    #[test]
    fn test_with_settings() {
        let settings = SearchSettings {
            max_parallel: 0,
            fallback_base_delay_ms: 250,
            priority_order: vec!["echo".into()],
        };
        let search = search().with_settings(&settings);
        assert_eq!(search.max_parallel, 1);
        assert_eq!(search.fallback_delay, Duration::from_millis(250));
    }
}
