//! Bounded retry with linear backoff

use crate::error::ProviderError;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Default number of attempts for transient failures
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default backoff unit between attempts
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(100);

/// Retry policy for transient (network-level) failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    /// The wait before attempt `n + 1` is `n * base_delay`
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// A policy that never retries
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Delay after the given (1-based) failed attempt
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }

    /// Run `op` until it succeeds, fails with a non-transient error, or the
    /// attempts are used up. `op` receives the 1-based attempt number.
    pub async fn run<T, F, Fut>(
        &self,
        cancel: &CancellationToken,
        mut op: F,
    ) -> Result<T, ProviderError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            if cancel.is_cancelled() {
                return Err(ProviderError::Cancelled);
            }

            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt < max_attempts => {
                    let delay = self.delay_for(attempt);
                    warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Transient failure, retrying"
                    );
                    sleep_or_cancel(delay, cancel).await?;
                    attempt += 1;
                }
                Err(err) => {
                    if err.is_transient() {
                        debug!(attempts = attempt, error = %err, "Giving up after retries");
                    }
                    return Err(err);
                }
            }
        }
    }
}

/// Sleep for `delay` unless `cancel` fires first
pub async fn sleep_or_cancel(
    delay: Duration,
    cancel: &CancellationToken,
) -> Result<(), ProviderError> {
    if delay.is_zero() {
        return if cancel.is_cancelled() {
            Err(ProviderError::Cancelled)
        } else {
            Ok(())
        };
    }

    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ProviderError::Cancelled),
        _ = tokio::time::sleep(delay) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Instant;

    fn fast_policy() -> RetryPolicy {
        RetryPolicy::new(3, Duration::from_millis(10))
    }

    #[test]
    fn test_linear_delay() {
        let policy = RetryPolicy::new(3, Duration::from_millis(100));
        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts, 1);
    }

    #[tokio::test]
    async fn test_retries_transient_then_succeeds() {
        let calls = AtomicU32::new(0);
        let cancel = CancellationToken::new();

        let result = fast_policy()
            .run(&cancel, |attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt < 3 {
                        Err(ProviderError::Network("connection reset".into()))
                    } else {
                        Ok(attempt)
                    }
                }
            })
            .await;

        assert_eq!(result, Ok(3));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let cancel = CancellationToken::new();
        let start = Instant::now();

        let result: Result<(), _> = fast_policy()
            .run(&cancel, |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(ProviderError::Timeout(Duration::from_secs(1))) }
            })
            .await;

        assert_eq!(result, Err(ProviderError::Timeout(Duration::from_secs(1))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // 10ms + 20ms of backoff
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[tokio::test]
    async fn test_does_not_retry_vendor_errors() {
        for err in [
            ProviderError::RateLimited,
            ProviderError::Authentication(401),
            ProviderError::Http {
                status: 500,
                message: "boom".into(),
            },
        ] {
            let calls = AtomicU32::new(0);
            let cancel = CancellationToken::new();
            let expected = err.clone();

            let result: Result<(), _> = fast_policy()
                .run(&cancel, |_| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    let err = err.clone();
                    async move { Err(err) }
                })
                .await;

            assert_eq!(result, Err(expected));
            assert_eq!(calls.load(Ordering::SeqCst), 1);
        }
    }

    #[tokio::test]
    async fn test_cancel_during_backoff() {
        let cancel = CancellationToken::new();
        let policy = RetryPolicy::new(3, Duration::from_secs(10));
        let trigger = cancel.clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let start = Instant::now();
        let result: Result<(), _> = policy
            .run(&cancel, |_| async {
                Err(ProviderError::Network("refused".into()))
            })
            .await;

        assert_eq!(result, Err(ProviderError::Cancelled));
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_sleep_or_cancel_zero_delay() {
        let cancel = CancellationToken::new();
        assert!(sleep_or_cancel(Duration::ZERO, &cancel).await.is_ok());
        cancel.cancel();
        assert_eq!(
            sleep_or_cancel(Duration::ZERO, &cancel).await,
            Err(ProviderError::Cancelled)
        );
    }

    #[tokio::test]
    async fn test_sleep_or_cancel() {
        let cancel = CancellationToken::new();
        tokio_test::assert_ok!(sleep_or_cancel(Duration::from_millis(1), &cancel).await);
        tokio_test::assert_ok!(sleep_or_cancel(Duration::ZERO, &cancel).await);

        cancel.cancel();
        tokio_test::assert_err!(sleep_or_cancel(Duration::from_secs(60), &cancel).await);
        tokio_test::assert_err!(sleep_or_cancel(Duration::ZERO, &cancel).await);
    }
}
