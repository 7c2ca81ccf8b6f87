//! Provider traits and types

use crate::error::ProviderError;
use crate::results::SearchResult;
use crate::search::SearchQuery;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use tokio_util::sync::CancellationToken;

/// Category of search; decides which providers are eligible
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchType {
    #[default]
    Web,
    Image,
    News,
    Video,
    Local,
}

impl SearchType {
    pub const ALL: [SearchType; 5] = [
        SearchType::Web,
        SearchType::Image,
        SearchType::News,
        SearchType::Video,
        SearchType::Local,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Web => "web",
            Self::Image => "image",
            Self::News => "news",
            Self::Video => "video",
            Self::Local => "local",
        }
    }
}

impl fmt::Display for SearchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "web" => Ok(Self::Web),
            "image" => Ok(Self::Image),
            "news" => Ok(Self::News),
            "video" => Ok(Self::Video),
            "local" => Ok(Self::Local),
            other => Err(format!("unknown search type: {}", other)),
        }
    }
}

/// Where a provider finds its secret (API key, instance URL, ...)
///
/// Resolved on every call so that credentials injected or revoked at runtime
/// are picked up without rebuilding the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    /// Read from an environment variable
    Env(String),
    /// Fixed value from configuration
    Static(String),
}

impl Credential {
    pub fn env(var: impl Into<String>) -> Self {
        Self::Env(var.into())
    }

    /// Current value, if set and non-blank
    pub fn resolve(&self) -> Option<String> {
        let value = match self {
            Self::Env(var) => std::env::var(var).ok()?,
            Self::Static(value) => value.clone(),
        };
        if value.trim().is_empty() {
            None
        } else {
            Some(value)
        }
    }

    pub fn is_set(&self) -> bool {
        self.resolve().is_some()
    }

    /// Human readable hint for error messages; never contains the secret
    pub fn describe(&self) -> String {
        match self {
            Self::Env(var) => var.clone(),
            Self::Static(_) => "configured value".to_string(),
        }
    }
}

/// HTTP request built by a provider adapter
#[derive(Debug, Clone)]
pub struct ProviderRequest {
    /// URL to request
    pub url: String,
    /// HTTP method
    pub method: HttpMethod,
    /// Request headers
    pub headers: HashMap<String, String>,
    /// Query parameters
    pub params: Vec<(String, String)>,
    /// Form body (POST only)
    pub form: Option<HashMap<String, String>>,
}

impl ProviderRequest {
    /// Create a GET request
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: HttpMethod::Get,
            headers: HashMap::new(),
            params: Vec::new(),
            form: None,
        }
    }

    /// Create a POST request
    pub fn post(url: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Post,
            ..Self::get(url)
        }
    }

    /// Add a header
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Add a query parameter
    pub fn param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.params.push((key.into(), value.to_string()));
        self
    }

    /// Add a query parameter only when a value is present
    pub fn optional_param<V: ToString>(self, key: &str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.param(key, v),
            None => self,
        }
    }

    /// Add form data
    pub fn form(mut self, data: HashMap<String, String>) -> Self {
        self.form = Some(data);
        self
    }
}

/// HTTP method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// HTTP response handed back to a provider adapter
#[derive(Debug, Clone)]
pub struct ProviderResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body as text
    pub text: String,
    /// Response URL (after redirects)
    pub url: String,
}

impl ProviderResponse {
    /// Check if response is successful (2xx)
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Fail with a classified error unless the status is 2xx
    pub fn error_for_status(self) -> Result<Self, ProviderError> {
        if self.is_success() {
            Ok(self)
        } else {
            let message: String = self.text.chars().take(200).collect();
            Err(ProviderError::from_status(self.status, message))
        }
    }

    /// Parse response as JSON
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, ProviderError> {
        Ok(serde_json::from_str(&self.text)?)
    }
}

/// Static description of a provider, used for listings
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProviderAbout {
    /// Website URL
    pub website: Option<String>,
    /// Whether it uses the official API
    pub official_api: bool,
    /// Credentials needed before the provider becomes available
    pub requires: Vec<String>,
}

impl ProviderAbout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn website(mut self, url: impl Into<String>) -> Self {
        self.website = Some(url.into());
        self
    }

    pub fn official_api(mut self, uses: bool) -> Self {
        self.official_api = uses;
        self
    }

    pub fn requires(mut self, what: impl Into<String>) -> Self {
        self.requires.push(what.into());
        self
    }
}

/// A pluggable search backend
#[async_trait]
pub trait Provider: Send + Sync {
    /// Unique provider name
    fn name(&self) -> &str;

    /// Short description of the provider
    fn about(&self) -> ProviderAbout {
        ProviderAbout::default()
    }

    /// Search types this provider can serve
    fn supported_types(&self) -> &[SearchType];

    fn supports(&self, search_type: SearchType) -> bool {
        self.supported_types().contains(&search_type)
    }

    /// Whether credentials/config are present right now. Must be cheap and
    /// free of I/O.
    fn is_available(&self) -> bool;

    /// Run one query. Callers only pass types from [`Provider::supported_types`].
    async fn search(
        &self,
        search_type: SearchType,
        query: &SearchQuery,
        cancel: &CancellationToken,
    ) -> Result<Vec<SearchResult>, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_type_parse() {
        assert_eq!("image".parse::<SearchType>(), Ok(SearchType::Image));
        assert_eq!(" NEWS ".parse::<SearchType>(), Ok(SearchType::News));
        assert_eq!("".parse::<SearchType>(), Ok(SearchType::Web));
        assert!("audio".parse::<SearchType>().is_err());
    }

    #[test]
    fn test_search_type_serde() {
        let json = serde_json::to_string(&SearchType::Video).unwrap();
        assert_eq!(json, "\"video\"");
        let parsed: SearchType = serde_json::from_str("\"local\"").unwrap();
        assert_eq!(parsed, SearchType::Local);
    }

    #[test]
    fn test_static_credential() {
        assert!(Credential::Static("key".into()).is_set());
        assert!(!Credential::Static("  ".into()).is_set());
        assert_eq!(Credential::Static("secret".into()).describe(), "configured value");
    }

    #[test]
    fn test_env_credential_unset() {
        let cred = Credential::env("UNISEARCH_TEST_CREDENTIAL_NEVER_SET");
        assert!(cred.resolve().is_none());
        assert_eq!(cred.describe(), "UNISEARCH_TEST_CREDENTIAL_NEVER_SET");
    }

    #[test]
    fn test_request_builder() {
        let request = ProviderRequest::get("https://example.com/search")
            .header("Accept", "application/json")
            .param("q", "rust")
            .optional_param::<u32>("offset", None)
            .optional_param("count", Some(5));

        assert_eq!(request.method, HttpMethod::Get);
        assert_eq!(request.params.len(), 2);
        assert_eq!(request.params[1], ("count".to_string(), "5".to_string()));
    }

    #[test]
    fn test_error_for_status() {
        let response = ProviderResponse {
            status: 429,
            text: String::new(),
            url: String::new(),
        };
        assert_eq!(
            response.error_for_status().unwrap_err(),
            ProviderError::RateLimited
        );
    }
}
