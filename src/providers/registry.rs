//! Registry of the search providers known to this process

use super::traits::{Provider, SearchType};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::warn;

/// Registry of all configured providers
///
/// Built once at startup and shared behind an `Arc`; it is never mutated
/// after construction, so concurrent readers need no locking.
pub struct ProviderRegistry {
    /// Providers in registration order
    providers: Vec<Arc<dyn Provider>>,
    /// Index into `providers` by name
    by_name: HashMap<String, usize>,
}

/// Listing entry for one provider
#[derive(Debug, Clone, Serialize)]
pub struct ProviderInfo {
    pub name: String,
    pub available: bool,
    pub supported_types: Vec<SearchType>,
    #[serde(flatten)]
    pub about: super::traits::ProviderAbout,
}

impl ProviderRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
            by_name: HashMap::new(),
        }
    }

    /// Register a provider. A provider with the same name replaces the
    /// earlier one but keeps its position.
    pub fn register(&mut self, provider: Arc<dyn Provider>) {
        let name = provider.name().to_string();
        match self.by_name.get(&name) {
            Some(&index) => {
                warn!(provider = %name, "Replacing already registered provider");
                self.providers[index] = provider;
            }
            None => {
                self.by_name.insert(name, self.providers.len());
                self.providers.push(provider);
            }
        }
    }

    /// Builder-style [`ProviderRegistry::register`]
    pub fn with(mut self, provider: Arc<dyn Provider>) -> Self {
        self.register(provider);
        self
    }

    /// Get a provider by name
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Provider>> {
        self.by_name.get(name).map(|&i| &self.providers[i])
    }

    /// Check if a provider exists
    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// All providers in registration order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Provider>> {
        self.providers.iter()
    }

    /// Get all provider names in registration order
    pub fn names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Providers whose credentials are present right now
    pub fn available(&self) -> Vec<&Arc<dyn Provider>> {
        self.providers.iter().filter(|p| p.is_available()).collect()
    }

    /// Get number of registered providers
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Check if registry is empty
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Search types at least one available provider can serve
    pub fn servable_types(&self) -> Vec<SearchType> {
        self.providers
            .iter()
            .filter(|p| p.is_available())
            .flat_map(|p| p.supported_types().iter().copied())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// First available provider in `priority` order, falling back to the
    /// first available one in registration order
    pub fn default_provider(&self, priority: &[String]) -> Option<&str> {
        priority
            .iter()
            .filter_map(|name| self.get(name))
            .find(|p| p.is_available())
            .or_else(|| self.providers.iter().find(|p| p.is_available()))
            .map(|p| p.name())
    }

    /// Describe every registered provider
    pub fn describe(&self) -> Vec<ProviderInfo> {
        self.providers
            .iter()
            .map(|p| ProviderInfo {
                name: p.name().to_string(),
                available: p.is_available(),
                supported_types: p.supported_types().to_vec(),
                about: p.about(),
            })
            .collect()
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}
