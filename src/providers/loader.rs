//! Provider loader for initializing providers from configuration

use super::registry::ProviderRegistry;
use super::traits::{Credential, Provider};
use super::{brave, duckduckgo, google, kagi, searxng, PROVIDER_NAMES};
use crate::config::{ProviderConfig, Settings};
use crate::network::RateLimitedClient;
use reqwest::Client;
use std::sync::Arc;
use tracing::{info, warn};

/// Loader for initializing providers from configuration
pub struct ProviderLoader;

impl ProviderLoader {
    /// Build every built-in provider that is not disabled.
    ///
    /// Each provider gets its own rate limiter on top of the shared reqwest
    /// client. Providers are registered even when their credentials are
    /// missing; availability is checked per request.
    pub fn load(settings: &Settings, client: Client) -> ProviderRegistry {
        let mut registry = ProviderRegistry::new();

        for config in &settings.providers {
            if !PROVIDER_NAMES.contains(&config.name.as_str()) {
                warn!("Ignoring settings for unknown provider: {}", config.name);
            }
        }

        for name in PROVIDER_NAMES {
            let config = settings.get_provider(name);
            if config.map_or(false, |c| c.disabled) {
                info!("Skipping disabled provider: {}", name);
                continue;
            }

            let transport = RateLimitedClient::new(client.clone(), settings.transport_for(name));
            let provider = Self::create_provider(name, transport, config);
            info!(
                provider = name,
                available = provider.is_available(),
                "Loaded provider"
            );
            registry.register(provider);
        }

        info!(
            "Loaded {} providers ({} available)",
            registry.len(),
            registry.available().len()
        );
        registry
    }

    fn create_provider(
        name: &str,
        transport: RateLimitedClient,
        config: Option<&ProviderConfig>,
    ) -> Arc<dyn Provider> {
        let api_key = config.and_then(|c| c.api_key.clone()).map(Credential::Static);
        let base_url = config.and_then(|c| c.base_url.clone());

        match name {
            "brave" => {
                let mut p = brave::Brave::new(transport);
                if let Some(key) = api_key {
                    p = p.with_api_key(key);
                }
                if let Some(url) = base_url {
                    p = p.with_base_url(url);
                }
                Arc::new(p)
            }
            "google" => {
                let mut p = google::Google::new(transport);
                if let Some(key) = api_key {
                    p = p.with_api_key(key);
                }
                if let Some(url) = base_url {
                    p = p.with_base_url(url);
                }
                Arc::new(p)
            }
            "kagi" => {
                let mut p = kagi::Kagi::new(transport);
                if let Some(key) = api_key {
                    p = p.with_api_key(key);
                }
                if let Some(url) = base_url {
                    p = p.with_base_url(url);
                }
                Arc::new(p)
            }
            "searxng" => {
                let mut p = searxng::SearXNG::new(transport);
                if let Some(url) = base_url {
                    p = p.with_base_url(Credential::Static(url));
                }
                Arc::new(p)
            }
            _ => {
                let mut p = duckduckgo::DuckDuckGo::new(transport);
                if let Some(url) = base_url {
                    p = p.with_base_url(url);
                }
                Arc::new(p)
            }
        }
    }

    /// Names of the providers this build knows how to create
    pub fn available_providers() -> Vec<&'static str> {
        PROVIDER_NAMES.to_vec()
    }
}
