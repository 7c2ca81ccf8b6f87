//! Candidate provider selection

use crate::config::default_priority_order;
use crate::providers::{Provider, ProviderRegistry, SearchType};
use std::sync::Arc;

/// Orders the providers able to serve a search type.
///
/// Providers named in the priority list come first, in that order; any
/// other qualifying provider follows in registration order.
#[derive(Debug, Clone)]
pub struct FallbackSelector {
    priority: Vec<String>,
}

impl FallbackSelector {
    pub fn new(priority: Vec<String>) -> Self {
        Self { priority }
    }

    pub fn priority(&self) -> &[String] {
        &self.priority
    }

    /// Candidate list for one request.
    ///
    /// With an explicit provider the list holds at most that provider and
    /// fallback is disabled. An empty list means nothing can serve the
    /// request.
    pub fn select(
        &self,
        registry: &ProviderRegistry,
        search_type: SearchType,
        explicit: Option<&str>,
    ) -> Vec<Arc<dyn Provider>> {
        let qualifies = |p: &Arc<dyn Provider>| p.is_available() && p.supports(search_type);

        if let Some(name) = explicit {
            return registry
                .get(name)
                .filter(|p| qualifies(*p))
                .cloned()
                .into_iter()
                .collect();
        }

        let mut candidates: Vec<Arc<dyn Provider>> = self
            .priority
            .iter()
            .filter_map(|name| registry.get(name))
            .filter(|p| qualifies(*p))
            .cloned()
            .collect();

        for provider in registry.iter() {
            let listed = candidates.iter().any(|c| c.name() == provider.name());
            if !listed && qualifies(provider) {
                candidates.push(provider.clone());
            }
        }

        candidates
    }
}

impl Default for FallbackSelector {
    fn default() -> Self {
        Self::new(default_priority_order())
    }
}
