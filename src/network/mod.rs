//! HTTP networking module
//!
//! Provides the rate-limited, retrying transport that sits between each
//! provider and the network.

mod client;
mod retry;
mod user_agent;

pub use client::{
    build_http_client, RateLimitedClient, TransportConfig, DEFAULT_RATE_LIMIT,
    DEFAULT_REQUEST_TIMEOUT, MAX_TOKEN_INTERVAL,
};
pub use retry::{sleep_or_cancel, RetryPolicy, DEFAULT_BASE_DELAY, DEFAULT_MAX_ATTEMPTS};
pub use user_agent::{accept_html, accept_json, accept_language, generate_user_agent};
