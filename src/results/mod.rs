//! Result types shared by providers and the orchestrator
//!
//! Providers produce [`SearchResult`]s; the orchestrator wraps them into one
//! [`QueryOutcome`] per query and an [`AggregateResponse`] per request.

mod types;

pub use types::*;
