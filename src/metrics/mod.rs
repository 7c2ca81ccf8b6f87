//! Metrics collection module
//!
//! Tracks provider attempts, error rates, latency and fallback usage.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

/// Response times kept per provider for the rolling average
const LATENCY_WINDOW: usize = 100;

/// Process-wide metrics collector, shared behind an `Arc`
pub struct Metrics {
    /// Search requests received
    total_requests: AtomicU64,
    /// Individual queries executed
    total_queries: AtomicU64,
    /// Queries no provider could answer
    failed_queries: AtomicU64,
    /// Times a query moved on to a later provider
    fallbacks: AtomicU64,
    providers: RwLock<HashMap<String, ProviderCounters>>,
}

#[derive(Default)]
struct ProviderCounters {
    attempts: u64,
    successes: u64,
    failures: u64,
    response_times: VecDeque<u64>,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            total_requests: AtomicU64::new(0),
            total_queries: AtomicU64::new(0),
            failed_queries: AtomicU64::new(0),
            fallbacks: AtomicU64::new(0),
            providers: RwLock::new(HashMap::new()),
        }
    }

    pub fn inc_request(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
    }

    /// Record the end of one query
    pub fn record_query(&self, succeeded: bool) {
        self.total_queries.fetch_add(1, Ordering::Relaxed);
        if !succeeded {
            self.failed_queries.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn inc_fallback(&self) {
        self.fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one provider call and how long it took
    pub fn record_attempt(&self, provider: &str, elapsed: Duration, succeeded: bool) {
        let mut providers = self
            .providers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let counters = providers.entry(provider.to_string()).or_default();

        counters.attempts += 1;
        if succeeded {
            counters.successes += 1;
        } else {
            counters.failures += 1;
        }

        if counters.response_times.len() >= LATENCY_WINDOW {
            counters.response_times.pop_front();
        }
        counters.response_times.push_back(elapsed.as_millis() as u64);
    }

    pub fn total_requests(&self) -> u64 {
        self.total_requests.load(Ordering::Relaxed)
    }

    pub fn total_queries(&self) -> u64 {
        self.total_queries.load(Ordering::Relaxed)
    }

    /// Statistics for one provider, if it has been called
    pub fn provider_stats(&self, provider: &str) -> Option<ProviderStats> {
        let providers = self
            .providers
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        providers.get(provider).map(ProviderStats::from)
    }

    /// Snapshot of everything collected so far
    pub fn snapshot(&self) -> MetricsSnapshot {
        let providers = self
            .providers
            .read()
            .unwrap_or_else(PoisonError::into_inner);

        MetricsSnapshot {
            total_requests: self.total_requests(),
            total_queries: self.total_queries(),
            failed_queries: self.failed_queries.load(Ordering::Relaxed),
            fallbacks: self.fallbacks.load(Ordering::Relaxed),
            providers: providers
                .iter()
                .map(|(name, counters)| (name.clone(), ProviderStats::from(counters)))
                .collect(),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Statistics for a single provider
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderStats {
    pub attempts: u64,
    pub successes: u64,
    pub failures: u64,
    /// Rolling average over the last calls, in milliseconds
    pub avg_response_ms: Option<u64>,
    /// Success percentage; 100 before the first call
    pub reliability: f64,
}

impl From<&ProviderCounters> for ProviderStats {
    fn from(counters: &ProviderCounters) -> Self {
        let avg_response_ms = if counters.response_times.is_empty() {
            None
        } else {
            Some(counters.response_times.iter().sum::<u64>() / counters.response_times.len() as u64)
        };

        let reliability = if counters.attempts == 0 {
            100.0
        } else {
            counters.successes as f64 / counters.attempts as f64 * 100.0
        };

        Self {
            attempts: counters.attempts,
            successes: counters.successes,
            failures: counters.failures,
            avg_response_ms,
            reliability,
        }
    }
}

/// Serializable view served on `/stats`
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub total_requests: u64,
    pub total_queries: u64,
    pub failed_queries: u64,
    pub fallbacks: u64,
    pub providers: BTreeMap<String, ProviderStats>,
}
