//! Per-query fallback execution

use super::models::SearchQuery;
use crate::error::ProviderError;
use crate::metrics::Metrics;
use crate::network::sleep_or_cancel;
use crate::providers::{Provider, ProviderRegistry, SearchType};
use crate::results::{QueryOutcome, SearchResult};
use crate::security::{screen_results, ContentScanner};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Default wait unit between fallback attempts
pub const DEFAULT_FALLBACK_DELAY: Duration = Duration::from_secs(1);

/// Runs one query against an ordered list of candidate providers until one
/// answers or the list is exhausted
#[derive(Clone)]
pub struct QueryExecutor {
    registry: Arc<ProviderRegistry>,
    fallback_delay: Duration,
    scanner: Option<Arc<dyn ContentScanner>>,
    metrics: Option<Arc<Metrics>>,
}

enum Attempt {
    Answered(Vec<SearchResult>),
    Failed(ProviderError),
}

impl QueryExecutor {
    pub fn new(registry: Arc<ProviderRegistry>) -> Self {
        Self {
            registry,
            fallback_delay: DEFAULT_FALLBACK_DELAY,
            scanner: None,
            metrics: None,
        }
    }

    /// Attempt `i` (0-based) waits `i * delay` before calling its provider
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

    /// Run `query` through `candidates` in order.
    ///
    /// Never fails: every error ends up in the returned outcome. Security
    /// blocks and cancellation stop the walk early.
    pub async fn execute(
        &self,
        search_type: SearchType,
        query: &SearchQuery,
        candidates: &[Arc<dyn Provider>],
        cancel: &CancellationToken,
    ) -> QueryOutcome {
        let mut errors: Vec<String> = Vec::new();

        for (index, provider) in candidates.iter().enumerate() {
            let name = provider.name();

            if cancel.is_cancelled() {
                self.record_query(false);
                return QueryOutcome::failure(
                    &query.query,
                    format!("search cancelled: request cancelled before trying {}", name),
                );
            }

            // Credentials may have gone away since selection
            if !self.registry.contains(name)
                || !provider.is_available()
                || !provider.supports(search_type)
            {
                debug!(provider = %name, query = %query.query, "Skipping provider that can no longer serve the query");
                continue;
            }

            if index > 0 {
                let delay = self.fallback_delay.saturating_mul(index as u32);
                warn!(
                    provider = %name,
                    query = %query.query,
                    delay_ms = delay.as_millis() as u64,
                    "Falling back to next provider"
                );
                if let Some(metrics) = &self.metrics {
                    metrics.inc_fallback();
                }
                if sleep_or_cancel(delay, cancel).await.is_err() {
                    self.record_query(false);
                    return QueryOutcome::failure(&query.query, "search cancelled during fallback");
                }
            }

            match self.attempt(provider.as_ref(), search_type, query, cancel).await {
                Attempt::Answered(results) => {
                    info!(
                        provider = %name,
                        query = %query.query,
                        results = results.len(),
                        "Query answered"
                    );
                    self.record_query(true);
                    return QueryOutcome::success(&query.query, name, results)
                        .with_fallback_errors(errors);
                }
                Attempt::Failed(ProviderError::Cancelled) => {
                    self.record_query(false);
                    return QueryOutcome::failure(
                        &query.query,
                        format!("search cancelled: request cancelled while querying {}", name),
                    );
                }
                Attempt::Failed(err) => {
                    warn!(provider = %name, query = %query.query, "Provider failed: {}", err);
                    errors.push(format!("{}: {}", name, err));
                    if err.is_fatal() {
                        break;
                    }
                }
            }
        }

        self.record_query(false);
        QueryOutcome::failure(&query.query, failure_message(&errors))
    }

    async fn attempt(
        &self,
        provider: &dyn Provider,
        search_type: SearchType,
        query: &SearchQuery,
        cancel: &CancellationToken,
    ) -> Attempt {
        let started = Instant::now();
        debug!(provider = %provider.name(), query = %query.query, "Calling provider");

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ProviderError::Cancelled),
            result = provider.search(search_type, query, cancel) => result,
        };

        let result = result.and_then(|results| match &self.scanner {
            Some(scanner) => screen_results(scanner.as_ref(), results),
            None => Ok(results),
        });

        // Cancellation and content blocks say nothing about provider health
        if let Some(metrics) = &self.metrics {
            if !matches!(
                result,
                Err(ProviderError::Cancelled | ProviderError::SecurityBlocked(_))
            ) {
                metrics.record_attempt(provider.name(), started.elapsed(), result.is_ok());
            }
        }

        match result {
            Ok(mut results) => {
                results.truncate(query.count as usize);
                Attempt::Answered(results)
            }
            Err(err) => Attempt::Failed(err),
        }
    }

    fn record_query(&self, succeeded: bool) {
        if let Some(metrics) = &self.metrics {
            metrics.record_query(succeeded);
        }
    }
}

/// Error text for a query no provider could answer
fn failure_message(errors: &[String]) -> String {
    match errors {
        [] => "search failed: no provider could serve the query".to_string(),
        [only] => format!("search failed: {}", only),
        many => format!("all providers failed: {}", many.join("; ")),
    }
}
