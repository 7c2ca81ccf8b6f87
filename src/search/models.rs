//! Search request and query data models

use crate::error::SearchError;
use crate::providers::SearchType;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Results per query when the caller does not say otherwise
pub const DEFAULT_COUNT: u32 = 5;

/// Free-form provider-specific parameters (freshness, language, pagination...)
///
/// Semantics belong to each provider; unknown keys are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProviderParams(HashMap<String, Value>);

impl ProviderParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a parameter
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    /// Builder-style [`ProviderParams::set`]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Non-empty string parameter
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Non-negative integer parameter, accepting JSON numbers (including
    /// integral floats) and numeric strings
    pub fn get_u64(&self, key: &str) -> Option<u64> {
        match self.0.get(key)? {
            Value::Number(n) => n.as_u64().or_else(|| {
                n.as_f64()
                    .filter(|f| *f >= 0.0 && f.fract() == 0.0)
                    .map(|f| f as u64)
            }),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, Value>> for ProviderParams {
    fn from(map: Map<String, Value>) -> Self {
        Self(map.into_iter().collect())
    }
}

/// A single query as handed to a provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    /// The search query string
    pub query: String,
    /// Maximum number of results wanted
    pub count: u32,
    /// Provider-specific parameters
    #[serde(default)]
    pub params: ProviderParams,
}

impl SearchQuery {
    /// Create a simple query with default count and no parameters
    pub fn simple(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            count: DEFAULT_COUNT,
            params: ProviderParams::new(),
        }
    }

    /// Set result count
    pub fn with_count(mut self, count: u32) -> Self {
        self.count = count.max(1);
        self
    }

    /// Set provider parameters
    pub fn with_params(mut self, params: ProviderParams) -> Self {
        self.params = params;
        self
    }
}

/// A complete multi-query search request
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    /// Search type
    pub search_type: SearchType,
    /// One or more independent queries
    pub queries: Vec<String>,
    /// Explicit provider; disables fallback
    pub provider: Option<String>,
    /// Per-query result cap
    pub count: u32,
    /// Everything else, forwarded to providers
    pub params: ProviderParams,
}

impl SearchRequest {
    /// Create a web search for the given queries
    pub fn new<I, S>(queries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            search_type: SearchType::Web,
            queries: queries.into_iter().map(Into::into).collect(),
            provider: None,
            count: DEFAULT_COUNT,
            params: ProviderParams::new(),
        }
    }

    /// Set search type
    pub fn with_type(mut self, search_type: SearchType) -> Self {
        self.search_type = search_type;
        self
    }

    /// Request a specific provider (no fallback)
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        let provider = provider.into();
        self.provider = if provider.trim().is_empty() {
            None
        } else {
            Some(provider)
        };
        self
    }

    /// Set result count
    pub fn with_count(mut self, count: u32) -> Self {
        self.count = count.max(1);
        self
    }

    /// Set a provider parameter
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.set(key, value);
        self
    }

    /// Parse a request from its JSON form.
    ///
    /// `type`, `query`, `provider` and `count` are recognised; every other key
    /// is collected into [`ProviderParams`].
    pub fn from_json(value: Value) -> Result<Self, SearchError> {
        let Value::Object(mut map) = value else {
            return Err(invalid("request body must be a JSON object"));
        };

        let search_type = match map.remove("type") {
            None | Some(Value::Null) => SearchType::Web,
            Some(Value::String(s)) => s.parse().map_err(SearchError::InvalidRequest)?,
            Some(_) => return Err(invalid("'type' must be a string")),
        };

        let queries = parse_queries(map.remove("query"))?;

        let provider = match map.remove("provider") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) if s.trim().is_empty() => None,
            Some(Value::String(s)) => Some(s.trim().to_string()),
            Some(_) => return Err(invalid("'provider' must be a string")),
        };

        let count = match map.remove("count") {
            None | Some(Value::Null) => DEFAULT_COUNT,
            Some(v) => v
                .as_u64()
                .or_else(|| v.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as u64))
                .filter(|n| *n > 0)
                .and_then(|n| u32::try_from(n).ok())
                .ok_or_else(|| invalid("'count' must be a positive integer"))?,
        };

        Ok(Self {
            search_type,
            queries,
            provider,
            count,
            params: ProviderParams::from(map),
        })
    }

    /// Check that there is at least one query and none is blank
    pub fn validate(&self) -> Result<(), SearchError> {
        if self.queries.is_empty() {
            return Err(invalid("'query' array cannot be empty"));
        }
        if let Some(i) = self.queries.iter().position(|q| q.trim().is_empty()) {
            return Err(invalid(format!(
                "query at index {} must be a non-empty string",
                i
            )));
        }
        Ok(())
    }

    /// One independent [`SearchQuery`] per input query, in input order
    pub fn search_queries(&self) -> Vec<SearchQuery> {
        self.queries
            .iter()
            .map(|q| SearchQuery {
                query: q.clone(),
                count: self.count,
                params: self.params.clone(),
            })
            .collect()
    }
}

fn invalid(message: impl Into<String>) -> SearchError {
    SearchError::InvalidRequest(message.into())
}

fn parse_queries(raw: Option<Value>) -> Result<Vec<String>, SearchError> {
    let items = match raw {
        None | Some(Value::Null) => {
            return Err(invalid(
                "missing required parameter 'query'. Provide search terms as an array (e.g. {\"query\": [\"rust async\"]})",
            ))
        }
        Some(Value::Array(items)) => items,
        Some(_) => {
            return Err(invalid(
                "'query' must be an array of strings (e.g. {\"query\": [\"search term\"]})",
            ))
        }
    };

    if items.is_empty() {
        return Err(invalid("'query' array cannot be empty"));
    }

    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| match item {
            Value::String(s) if !s.trim().is_empty() => Ok(s),
            _ => Err(invalid(format!(
                "query at index {} must be a non-empty string",
                i
            ))),
        })
        .collect()
}
