//! Application state shared across handlers

use crate::config::Settings;
use crate::metrics::Metrics;
use crate::providers::ProviderRegistry;
use crate::search::Search;
use crate::security::ContentScanner;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Global settings
    pub settings: Arc<Settings>,
    /// Search orchestrator
    pub search: Arc<Search>,
    /// Metrics collector
    pub metrics: Arc<Metrics>,
}

impl AppState {
    /// Create new application state
    pub fn new(
        settings: Settings,
        registry: ProviderRegistry,
        scanner: Option<Arc<dyn ContentScanner>>,
    ) -> Self {
        let metrics = Arc::new(Metrics::new());
        let mut search = Search::new(Arc::new(registry))
            .with_settings(&settings.search)
            .with_metrics(metrics.clone());
        if let Some(scanner) = scanner {
            search = search.with_scanner(scanner);
        }

        Self {
            settings: Arc::new(settings),
            search: Arc::new(search),
            metrics,
        }
    }

    /// Get instance name
    pub fn instance_name(&self) -> &str {
        &self.settings.general.instance_name
    }
}
