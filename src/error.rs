//! Error types for provider calls and search requests

use crate::providers::SearchType;
use std::time::Duration;

/// Error returned by a single provider call
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    /// The provider does not serve this search type
    #[error("search type '{0}' is not supported")]
    Unsupported(SearchType),

    /// Required credentials or endpoint are missing
    #[error("provider not configured: {0}")]
    NotConfigured(String),

    /// Connection-level failure
    #[error("network error: {0}")]
    Network(String),

    /// The attempt exceeded the request timeout
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The vendor reported throttling (HTTP 429)
    #[error("rate limited by provider (HTTP 429)")]
    RateLimited,

    /// Invalid or missing credentials (HTTP 401/403)
    #[error("authentication failed (HTTP {0})")]
    Authentication(u16),

    /// Any other well-formed error response
    #[error("HTTP error {status}: {message}")]
    Http { status: u16, message: String },

    /// The response body could not be understood
    #[error("failed to parse response: {0}")]
    Parse(String),

    /// Content scanning flagged the request or its results
    #[error("blocked by security policy: {0}")]
    SecurityBlocked(String),

    /// The caller cancelled the search
    #[error("request cancelled")]
    Cancelled,
}

impl ProviderError {
    /// Connection errors and timeouts; the only failures worth retrying
    /// against the same provider.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Timeout(_))
    }

    /// Errors that end the query instead of advancing to the next provider.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::SecurityBlocked(_) | Self::Cancelled)
    }

    /// Classify an HTTP status that is not a success.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        match status {
            429 => Self::RateLimited,
            401 | 403 => Self::Authentication(status),
            _ => Self::Http {
                status,
                message: message.into(),
            },
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return Self::from_status(status.as_u16(), err.to_string());
        }
        if err.is_decode() {
            return Self::Parse(err.to_string());
        }
        // Everything else (connect, body, redirect, request) is treated as
        // a network failure.
        Self::Network(err.to_string())
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

/// Error returned for a whole search request
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SearchError {
    /// The request itself is malformed
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// No registered provider can serve the search type
    #[error("no available providers support search type: {0}")]
    NoProviders(SearchType),

    /// The explicitly requested provider cannot serve the request
    #[error("provider '{provider}' is not available or does not support search type: {search_type}")]
    ProviderUnavailable {
        provider: String,
        search_type: SearchType,
    },

    /// Every query in the batch failed
    #[error("all queries failed: {0}")]
    AllQueriesFailed(String),

    /// The caller cancelled the request
    #[error("search cancelled")]
    Cancelled,
}
