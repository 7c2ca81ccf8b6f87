//! Rate-limited HTTP transport used by every provider

use super::retry::RetryPolicy;
use crate::config::OutgoingSettings;
use crate::error::ProviderError;
use crate::providers::{HttpMethod, ProviderRequest, ProviderResponse};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::{Client, Response};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Default per-attempt request timeout
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default requests per second for each provider
pub const DEFAULT_RATE_LIMIT: f64 = 1.0;

/// Longest wait between tokens, however small the configured rate
pub const MAX_TOKEN_INTERVAL: Duration = Duration::from_secs(3600);

/// Build the shared reqwest client from outgoing settings
pub fn build_http_client(settings: &OutgoingSettings) -> anyhow::Result<Client> {
    let mut builder = Client::builder()
        .pool_max_idle_per_host(settings.pool_maxsize)
        .gzip(true)
        .brotli(true);

    // SSL verification
    if !settings.verify_ssl {
        builder = builder.danger_accept_invalid_certs(true);
    }

    // Proxy settings
    if let Some(ref proxy_url) = settings.proxies.all {
        builder = builder.proxy(reqwest::Proxy::all(proxy_url)?);
    } else {
        if let Some(ref http) = settings.proxies.http {
            builder = builder.proxy(reqwest::Proxy::http(http)?);
        }
        if let Some(ref https) = settings.proxies.https {
            builder = builder.proxy(reqwest::Proxy::https(https)?);
        }
    }

    Ok(builder.build()?)
}

/// Transport settings for one provider
#[derive(Debug, Clone, PartialEq)]
pub struct TransportConfig {
    /// Token refill rate; burst is always 1
    pub requests_per_second: f64,
    /// Bound on each individual attempt
    pub request_timeout: Duration,
    /// Retry policy for transient failures
    pub retry: RetryPolicy,
    /// User agent sent unless the request sets its own
    pub user_agent: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            requests_per_second: DEFAULT_RATE_LIMIT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            retry: RetryPolicy::default(),
            user_agent: format!("unisearch/{}", crate::VERSION),
        }
    }
}

impl TransportConfig {
    /// Interval between tokens for the configured rate
    pub fn interval(&self) -> Duration {
        let rate = if self.requests_per_second.is_finite() && self.requests_per_second > 0.0 {
            self.requests_per_second
        } else {
            DEFAULT_RATE_LIMIT
        };
        Duration::try_from_secs_f64(1.0 / rate)
            .unwrap_or(MAX_TOKEN_INTERVAL)
            .clamp(Duration::from_nanos(1), MAX_TOKEN_INTERVAL)
    }
}

/// HTTP client wrapper owned by one provider: token-bucket rate limiting,
/// per-attempt timeout, and bounded retry of transient failures.
///
/// Clones share the same limiter.
#[derive(Clone)]
pub struct RateLimitedClient {
    client: Client,
    limiter: Arc<DefaultDirectRateLimiter>,
    config: TransportConfig,
}

impl RateLimitedClient {
    /// Create a transport on top of a shared reqwest client
    pub fn new(client: Client, config: TransportConfig) -> Self {
        let quota = Quota::with_period(config.interval())
            .unwrap_or_else(|| Quota::per_second(NonZeroU32::MIN))
            .allow_burst(NonZeroU32::MIN);

        Self {
            client,
            limiter: Arc::new(RateLimiter::direct(quota)),
            config,
        }
    }

    /// Create a transport with its own reqwest client
    pub fn standalone(config: TransportConfig) -> Self {
        Self::new(Client::new(), config)
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Wait for a rate-limit token, or fail if cancelled first
    pub async fn acquire(&self, cancel: &CancellationToken) -> Result<(), ProviderError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ProviderError::Cancelled),
            _ = self.limiter.until_ready() => Ok(()),
        }
    }

    /// Execute a provider request with rate limiting, timeout and retry.
    ///
    /// HTTP 429 and 401/403 are returned as errors straight away; other
    /// statuses are handed back for the provider to interpret.
    pub async fn execute(
        &self,
        request: ProviderRequest,
        cancel: &CancellationToken,
    ) -> Result<ProviderResponse, ProviderError> {
        self.config
            .retry
            .run(cancel, |attempt| {
                let request = request.clone();
                async move { self.attempt(request, attempt, cancel).await }
            })
            .await
    }

    async fn attempt(
        &self,
        request: ProviderRequest,
        attempt: u32,
        cancel: &CancellationToken,
    ) -> Result<ProviderResponse, ProviderError> {
        self.acquire(cancel).await?;

        debug!(url = %request.url, attempt, "Sending provider request");

        let timeout = self.config.request_timeout;
        let send = async {
            let response = self.build(request).send().await?;
            Self::parse_response(response).await
        };

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ProviderError::Cancelled),
            result = tokio::time::timeout(timeout, send) => match result {
                Ok(response) => response?,
                Err(_) => return Err(ProviderError::Timeout(timeout)),
            },
        };

        match response.status {
            429 | 401 | 403 => Err(ProviderError::from_status(
                response.status,
                response.text,
            )),
            _ => Ok(response),
        }
    }

    fn build(&self, request: ProviderRequest) -> reqwest::RequestBuilder {
        let mut builder = match request.method {
            HttpMethod::Get => self.client.get(&request.url),
            HttpMethod::Post => self.client.post(&request.url),
        };

        let has_user_agent = request
            .headers
            .keys()
            .any(|k| k.eq_ignore_ascii_case("user-agent"));
        if !has_user_agent {
            builder = builder.header("User-Agent", &self.config.user_agent);
        }

        for (key, value) in &request.headers {
            builder = builder.header(key, value);
        }

        if !request.params.is_empty() {
            builder = builder.query(&request.params);
        }

        if let Some(form) = request.form {
            builder = builder.form(&form);
        }

        builder
    }

    async fn parse_response(response: Response) -> Result<ProviderResponse, ProviderError> {
        let status = response.status().as_u16();
        let url = response.url().to_string();
        let text = response.text().await?;

        Ok(ProviderResponse { status, text, url })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fast_config() -> TransportConfig {
        TransportConfig {
            requests_per_second: 1000.0,
            request_timeout: Duration::from_millis(200),
            retry: RetryPolicy::new(3, Duration::from_millis(10)),
            user_agent: "unisearch-test".to_string(),
        }
    }

    #[test]
    fn test_interval() {
        let mut config = TransportConfig::default();
        assert_eq!(config.interval(), Duration::from_secs(1));
        config.requests_per_second = 4.0;
        assert_eq!(config.interval(), Duration::from_millis(250));
        config.requests_per_second = -1.0;
        assert_eq!(config.interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_tiny_rate_is_capped() {
        let mut config = TransportConfig::default();
        config.requests_per_second = 1e-30;
        assert_eq!(config.interval(), MAX_TOKEN_INTERVAL);
        config.requests_per_second = 1e-4;
        assert_eq!(config.interval(), MAX_TOKEN_INTERVAL);
        config.requests_per_second = 1e-3;
        assert_eq!(config.interval(), Duration::from_secs(1000));

        // The limiter must build from such a config
        let client = RateLimitedClient::standalone(config);
        assert_eq!(client.config().interval(), MAX_TOKEN_INTERVAL);
    }

    #[tokio::test]
    async fn test_execute_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("q", "rust"))
            .and(header("User-Agent", "unisearch-test"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{\"ok\":true}"))
            .expect(1)
            .mount(&server)
            .await;

        let client = RateLimitedClient::standalone(fast_config());
        let request = ProviderRequest::get(format!("{}/search", server.uri())).param("q", "rust");
        let response = client
            .execute(request, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.text, "{\"ok\":true}");
    }

    #[tokio::test]
    async fn test_rate_limited_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .expect(1)
            .mount(&server)
            .await;

        let client = RateLimitedClient::standalone(fast_config());
        let result = client
            .execute(ProviderRequest::get(server.uri()), &CancellationToken::new())
            .await;

        assert_eq!(result.unwrap_err(), ProviderError::RateLimited);
    }

    #[tokio::test]
    async fn test_auth_failure_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;

        let client = RateLimitedClient::standalone(fast_config());
        let result = client
            .execute(ProviderRequest::get(server.uri()), &CancellationToken::new())
            .await;

        assert_eq!(result.unwrap_err(), ProviderError::Authentication(401));
    }

    #[tokio::test]
    async fn test_server_error_is_returned_to_caller() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
            .expect(1)
            .mount(&server)
            .await;

        let client = RateLimitedClient::standalone(fast_config());
        let response = client
            .execute(ProviderRequest::get(server.uri()), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(response.status, 503);
        assert!(response.error_for_status().is_err());
    }

    #[tokio::test]
    async fn test_timeout_is_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .expect(3)
            .mount(&server)
            .await;

        let mut config = fast_config();
        config.request_timeout = Duration::from_millis(50);
        let client = RateLimitedClient::standalone(config);
        let result = client
            .execute(ProviderRequest::get(server.uri()), &CancellationToken::new())
            .await;

        assert_eq!(
            result.unwrap_err(),
            ProviderError::Timeout(Duration::from_millis(50))
        );
    }

    #[tokio::test]
    async fn test_connection_refused_is_retried() {
        // Grab a free port, then close it so connections are refused.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = RateLimitedClient::standalone(fast_config());
        let start = Instant::now();
        let result = client
            .execute(
                ProviderRequest::get(format!("http://{}/", addr)),
                &CancellationToken::new(),
            )
            .await;

        assert!(matches!(result, Err(ProviderError::Network(_))));
        // Two backoff waits: 10ms + 20ms
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[tokio::test]
    async fn test_limiter_wait_is_cancellable() {
        let mut config = fast_config();
        config.requests_per_second = 0.1;
        let client = RateLimitedClient::standalone(config);
        let cancel = CancellationToken::new();

        // The first token is free; the second would take ten seconds.
        client.acquire(&cancel).await.unwrap();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let start = Instant::now();
        assert_eq!(client.acquire(&cancel).await, Err(ProviderError::Cancelled));
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_limiter_paces_calls() {
        let mut config = fast_config();
        config.requests_per_second = 20.0;
        let client = RateLimitedClient::standalone(config);
        let cancel = CancellationToken::new();

        let start = Instant::now();
        for _ in 0..3 {
            client.acquire(&cancel).await.unwrap();
        }
        // Burst of one, then 50ms per token
        assert!(start.elapsed() >= Duration::from_millis(90));
    }
}
