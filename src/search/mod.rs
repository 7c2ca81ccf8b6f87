//! Search orchestration module
//!
//! Selects candidate providers, runs each query through its fallback chain
//! on a bounded worker pool, and aggregates the outcomes.

mod aggregator;
mod dispatcher;
mod executor;
mod models;
mod orchestrator;
mod selector;

pub use aggregator::{aggregate, summarize};
pub use dispatcher::{Dispatcher, DEFAULT_MAX_PARALLEL};
pub use executor::{QueryExecutor, DEFAULT_FALLBACK_DELAY};
pub use models::*;
pub use orchestrator::{ProvidersDescription, Search};
pub use selector::FallbackSelector;
