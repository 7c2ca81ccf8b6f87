//! Unisearch: multi-provider search orchestration
//!
//! Runs batches of independent queries against a set of pluggable search
//! providers. Each query falls back through the providers able to serve its
//! search type, every provider call is rate limited and retried by its own
//! transport, and the outcomes are aggregated in input order.

pub mod config;
pub mod error;
pub mod metrics;
pub mod network;
pub mod providers;
pub mod results;
pub mod search;
pub mod security;
pub mod web;

pub use config::Settings;
pub use error::{ProviderError, SearchError};
pub use providers::{Provider, ProviderRegistry, SearchType};
pub use results::{AggregateResponse, QueryOutcome, SearchResult};
pub use search::{Search, SearchQuery, SearchRequest};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
