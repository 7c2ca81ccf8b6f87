//! Result type definitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

/// A single search result, as normalised from any provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Title of the result
    pub title: String,
    /// The URL of the result
    pub url: String,
    /// Snippet or description
    #[serde(default)]
    pub description: String,
    /// Provider-specific extras (rating, duration, coordinates, thumbnails, ...)
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl SearchResult {
    /// Create a new result
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            description: String::new(),
            metadata: Map::new(),
        }
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Add a metadata entry
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Add a metadata entry only when a value is present
    pub fn with_optional_metadata<V: Into<Value>>(self, key: &str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.with_metadata(key, v),
            None => self,
        }
    }

    /// Text handed to the content scanner
    pub fn scan_text(&self) -> String {
        format!("{} {}", self.title, self.description)
    }
}

/// Outcome of running the fallback chain for one query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryOutcome {
    /// The query string as supplied
    pub query: String,
    /// Results from the provider that answered (empty on failure or zero hits)
    pub results: Vec<SearchResult>,
    /// Provider that answered
    #[serde(serialize_with = "empty_if_none", default, deserialize_with = "none_if_empty")]
    pub provider: Option<String>,
    /// Set only when no provider could answer
    #[serde(serialize_with = "empty_if_none", default, deserialize_with = "none_if_empty")]
    pub error: Option<String>,
    /// Errors from providers that failed before the one that answered
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fallback_errors: Vec<String>,
}

impl QueryOutcome {
    /// A successful outcome
    pub fn success(
        query: impl Into<String>,
        provider: impl Into<String>,
        results: Vec<SearchResult>,
    ) -> Self {
        Self {
            query: query.into(),
            results,
            provider: Some(provider.into()),
            error: None,
            fallback_errors: vec![],
        }
    }

    /// A failed outcome
    pub fn failure(query: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            results: vec![],
            provider: None,
            error: Some(error.into()),
            fallback_errors: vec![],
        }
    }

    /// Attach errors from providers tried before the successful one
    pub fn with_fallback_errors(mut self, errors: Vec<String>) -> Self {
        self.fallback_errors = errors;
        self
    }

    pub fn is_success(&self) -> bool {
        self.error.as_deref().map_or(true, str::is_empty)
    }
}

/// Counts over all outcomes of a request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
}

/// Response for a whole multi-query request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateResponse {
    /// One outcome per input query, in input order
    pub searches: Vec<QueryOutcome>,
    pub summary: Summary,
    pub timestamp: DateTime<Utc>,
}

fn empty_if_none<S: Serializer>(value: &Option<String>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(value.as_deref().unwrap_or(""))
}

fn none_if_empty<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()))
}
