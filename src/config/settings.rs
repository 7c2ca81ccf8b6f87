//! Settings structures for unisearch configuration

use crate::network::{RetryPolicy, TransportConfig, DEFAULT_REQUEST_TIMEOUT};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Env var for the worker pool size
pub const MAX_PARALLEL_ENV: &str = "INTERNET_SEARCH_MAX_PARALLEL";
/// Env var for the default per-provider rate (requests per second)
pub const RATE_LIMIT_ENV: &str = "INTERNET_SEARCH_RATE_LIMIT";
/// Env var for the per-attempt timeout in seconds
pub const TIMEOUT_ENV: &str = "INTERNET_SEARCH_TIMEOUT";

/// Main settings structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub server: ServerSettings,
    pub search: SearchSettings,
    pub outgoing: OutgoingSettings,
    pub providers: Vec<ProviderConfig>,
    pub security: SecuritySettings,
}

impl Settings {
    /// Load settings from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let settings: Settings = serde_yaml::from_str(&content)?;
        Ok(settings)
    }

    /// Merge with environment variables
    pub fn merge_env(&mut self) {
        self.merge_env_from(|key| std::env::var(key).ok());
    }

    /// Merge with values from `lookup`. Invalid or non-positive numbers are
    /// ignored and the current value is kept.
    pub fn merge_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("UNISEARCH_DEBUG") {
            self.general.debug = val.trim().parse().unwrap_or(false);
        }
        if let Some(port) = lookup("UNISEARCH_PORT").and_then(|v| parse_positive(&v)) {
            self.server.port = port;
        }
        if let Some(val) = lookup("UNISEARCH_BIND_ADDRESS") {
            self.server.bind_address = val;
        }

        if let Some(n) = lookup(MAX_PARALLEL_ENV).and_then(|v| parse_positive(&v)) {
            self.search.max_parallel = n;
        }
        if let Some(rate) = lookup(RATE_LIMIT_ENV).and_then(|v| parse_positive(&v)) {
            self.outgoing.rate_limit = rate;
        }
        if let Some(secs) = lookup(TIMEOUT_ENV).and_then(|v| parse_positive(&v)) {
            self.outgoing.request_timeout = secs;
        }

        let mut names: Vec<String> = self.providers.iter().map(|p| p.name.clone()).collect();
        names.extend(self.search.priority_order.iter().cloned());
        for name in names {
            let key = format!("{}_{}", RATE_LIMIT_ENV, name.to_ascii_uppercase());
            if let Some(rate) = lookup(&key).and_then(|v| parse_positive::<f64>(&v)) {
                self.provider_mut(&name).rate_limit = Some(rate);
            }
        }
    }

    /// Get provider config by name
    pub fn get_provider(&self, name: &str) -> Option<&ProviderConfig> {
        self.providers.iter().find(|p| p.name == name)
    }

    /// Transport settings for one provider, with its overrides applied
    pub fn transport_for(&self, name: &str) -> TransportConfig {
        let provider = self.get_provider(name);
        let rate = provider
            .and_then(|p| p.rate_limit)
            .filter(|r| *r > 0.0)
            .unwrap_or(self.outgoing.rate_limit);
        let timeout = provider
            .and_then(|p| p.timeout)
            .filter(|t| *t > 0.0)
            .unwrap_or(self.outgoing.request_timeout);

        let mut config = TransportConfig {
            requests_per_second: rate,
            request_timeout: Duration::try_from_secs_f64(timeout)
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT),
            retry: RetryPolicy::new(
                self.outgoing.retry_max_attempts,
                Duration::from_millis(self.outgoing.retry_base_delay_ms),
            ),
            ..TransportConfig::default()
        };
        if let Some(ref ua) = self.outgoing.user_agent {
            config.user_agent = ua.clone();
        }
        config
    }

    /// Config entry for `name`, created with defaults if missing
    fn provider_mut(&mut self, name: &str) -> &mut ProviderConfig {
        let index = match self.providers.iter().position(|p| p.name == name) {
            Some(index) => index,
            None => {
                self.providers.push(ProviderConfig::named(name));
                self.providers.len() - 1
            }
        };
        &mut self.providers[index]
    }
}

/// General settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Enable debug logging
    pub debug: bool,
    /// Instance name reported by the API
    pub instance_name: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            debug: false,
            instance_name: "unisearch".to_string(),
        }
    }
}

/// Server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Server port
    pub port: u16,
    /// Bind address
    pub bind_address: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            port: 8888,
            bind_address: "127.0.0.1".to_string(),
        }
    }
}

/// Orchestration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    /// Maximum number of queries executed concurrently
    pub max_parallel: usize,
    /// Fallback attempt `i` waits `i * fallback_base_delay_ms` first
    pub fallback_base_delay_ms: u64,
    /// Providers tried first during fallback, most reliable first
    pub priority_order: Vec<String>,
}

impl SearchSettings {
    pub fn fallback_base_delay(&self) -> Duration {
        Duration::from_millis(self.fallback_base_delay_ms)
    }
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            max_parallel: 3,
            fallback_base_delay_ms: 1000,
            priority_order: default_priority_order(),
        }
    }
}

/// Outgoing request settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutgoingSettings {
    /// Per-attempt request timeout in seconds
    pub request_timeout: f64,
    /// Requests per second allowed to each provider
    pub rate_limit: f64,
    /// Attempts for transient failures, including the first
    pub retry_max_attempts: u32,
    /// Linear backoff unit in milliseconds
    pub retry_base_delay_ms: u64,
    /// User agent for API providers (none = crate default)
    pub user_agent: Option<String>,
    /// Pool max idle connections per host
    pub pool_maxsize: usize,
    /// Verify SSL certificates
    pub verify_ssl: bool,
    /// Proxy settings
    pub proxies: ProxySettings,
}

impl Default for OutgoingSettings {
    fn default() -> Self {
        Self {
            request_timeout: 30.0,
            rate_limit: 1.0,
            retry_max_attempts: 3,
            retry_base_delay_ms: 100,
            user_agent: None,
            pool_maxsize: 20,
            verify_ssl: true,
            proxies: ProxySettings::default(),
        }
    }
}

/// Proxy settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxySettings {
    pub http: Option<String>,
    pub https: Option<String>,
    pub all: Option<String>,
}

/// Individual provider configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Provider name (unique identifier)
    pub name: String,
    /// Whether the provider is left out of the registry
    pub disabled: bool,
    /// Requests per second override
    pub rate_limit: Option<f64>,
    /// Per-attempt timeout override in seconds
    pub timeout: Option<f64>,
    /// Endpoint override
    pub base_url: Option<String>,
    /// Credential override; takes precedence over the environment
    pub api_key: Option<String>,
}

impl ProviderConfig {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// Content scanning settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SecuritySettings {
    /// Regexes that block a query's results
    pub block_patterns: Vec<String>,
    /// Regexes that only annotate matching results
    pub warn_patterns: Vec<String>,
}

impl SecuritySettings {
    pub fn is_enabled(&self) -> bool {
        !self.block_patterns.is_empty() || !self.warn_patterns.is_empty()
    }
}

/// Default fallback priority
pub fn default_priority_order() -> Vec<String> {
    ["brave", "google", "kagi", "searxng", "duckduckgo"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn parse_positive<T>(raw: &str) -> Option<T>
where
    T: FromStr + PartialOrd + Default,
{
    raw.trim().parse::<T>().ok().filter(|v| *v > T::default())
}
