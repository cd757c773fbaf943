//! Remote call retry logic
//!
//! Bounded retry with exponential backoff, applied uniformly to every remote
//! call (sentiment analysis, job submission, job status query, best-effort
//! persistence). Never used for local store mutations.

use moodlog_common::config::RetryConfig;
use moodlog_common::Result;
use std::future::Future;
use std::time::Duration;

/// Longest backoff between two attempts
pub const MAX_BACKOFF: Duration = Duration::from_secs(300);

/// Retry policy for remote calls
///
/// **Algorithm:**
/// 1. Attempt operation immediately
/// 2. If successful, return result
/// 3. If the error is not retryable, return it immediately
/// 4. If attempts remain, sleep `base_delay × backoff_multiplier^(attempt-1)` and retry
/// 5. After `max_attempts` failures, return the last error unchanged
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    backoff_multiplier: f64,
}

impl RetryPolicy {
    /// `max_attempts` below 1 is raised to 1; a multiplier below 1 is raised to 1
    pub fn new(max_attempts: u32, base_delay: Duration, backoff_multiplier: f64) -> Self {
        let backoff_multiplier = if backoff_multiplier.is_finite() {
            backoff_multiplier.max(1.0)
        } else {
            1.0
        };

        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            backoff_multiplier,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(
            config.max_attempts,
            Duration::from_millis(config.base_delay_ms),
            config.backoff_multiplier,
        )
    }

    /// Single attempt, no retries
    pub fn no_retry() -> Self {
        Self::new(1, Duration::ZERO, 1.0)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay before the retry following failed attempt number `attempt` (1-based)
    ///
    /// Saturates at [`MAX_BACKOFF`].
    pub fn delay_after(&self, attempt: u32) -> Duration {
        if self.base_delay.is_zero() {
            return Duration::ZERO;
        }

        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let nanos = self.base_delay.as_nanos() as f64 * self.backoff_multiplier.powi(exponent);
        if !nanos.is_finite() || nanos >= MAX_BACKOFF.as_nanos() as f64 {
            return MAX_BACKOFF;
        }
        Duration::from_nanos(nanos as u64)
    }

    /// Run `operation` under this policy
    ///
    /// # Arguments
    /// * `operation_name` - Name for logging (e.g., "sentiment analysis", "job submission")
    /// * `operation` - Closure producing a fresh future per attempt
    pub async fn run<F, Fut, T>(&self, operation_name: &str, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;

        loop {
            attempt += 1;

            if attempt > 1 {
                tracing::debug!(
                    operation = operation_name,
                    attempt,
                    "Retrying remote operation"
                );
            }

            match operation().await {
                Ok(result) => {
                    if attempt > 1 {
                        tracing::debug!(
                            operation = operation_name,
                            attempt,
                            "Remote operation succeeded after retry"
                        );
                    }
                    return Ok(result);
                }
                Err(err) => {
                    if !err.is_retryable() {
                        tracing::debug!(
                            operation = operation_name,
                            attempt,
                            error = %err,
                            "Remote operation failed with non-retryable error"
                        );
                        return Err(err);
                    }

                    if attempt >= self.max_attempts {
                        tracing::warn!(
                            operation = operation_name,
                            attempts = attempt,
                            error = %err,
                            "Remote operation failed: retries exhausted"
                        );
                        return Err(err);
                    }

                    let delay = self.delay_after(attempt);
                    tracing::warn!(
                        operation = operation_name,
                        attempt,
                        backoff_ms = delay.as_millis() as u64,
                        error = %err,
                        "Remote operation failed, will retry after backoff"
                    );

                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use moodlog_common::Error;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(max_attempts, Duration::from_millis(1), 2.0)
    }

    /// Operation failing `failures` times with a network error, then succeeding
    fn flaky(
        calls: Arc<AtomicU32>,
        failures: u32,
    ) -> impl FnMut() -> std::pin::Pin<Box<dyn Future<Output = Result<u32>> + Send>> {
        move || {
            let calls = calls.clone();
            Box::pin(async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n <= failures {
                    Err(Error::Network(format!("attempt {} failed", n)))
                } else {
                    Ok(42)
                }
            })
        }
    }

    #[tokio::test]
    async fn test_succeeds_first_attempt() {
        let calls = Arc::new(AtomicU32::new(0));
        let result = fast_policy(2).run("test_op", flaky(calls.clone(), 0)).await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_k_failures_below_bound_invoke_k_plus_one_times() {
        for k in 0..4 {
            let calls = Arc::new(AtomicU32::new(0));
            let result = fast_policy(5).run("test_op", flaky(calls.clone(), k)).await;

            assert_eq!(result.unwrap(), 42);
            assert_eq!(calls.load(Ordering::SeqCst), k + 1);
        }
    }

    #[tokio::test]
    async fn test_exhausted_retries_return_last_error_unchanged() {
        let calls = Arc::new(AtomicU32::new(0));
        let result = fast_policy(3).run("test_op", flaky(calls.clone(), u32::MAX)).await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        match result {
            Err(Error::Network(message)) => assert_eq!(message, "attempt 3 failed"),
            other => panic!("expected last network error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_non_retryable_error_fails_immediately() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result = fast_policy(5)
            .run("test_op", || {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Err::<u32, Error>(Error::Provider("invalid api key".into())) }
            })
            .await;

        assert!(matches!(result, Err(Error::Provider(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_backoff_schedule() {
        let policy = RetryPolicy::new(4, Duration::from_millis(100), 2.0);
        assert_eq!(policy.delay_after(1), Duration::from_millis(100));
        assert_eq!(policy.delay_after(2), Duration::from_millis(200));
        assert_eq!(policy.delay_after(3), Duration::from_millis(400));
    }

    #[test]
    fn test_backoff_saturates_for_huge_attempt_counts() {
        let policy = RetryPolicy::new(u32::MAX, Duration::from_millis(500), 10.0);
        assert_eq!(policy.delay_after(40), MAX_BACKOFF);
        assert_eq!(policy.delay_after(u32::MAX), MAX_BACKOFF);

        let long_base = RetryPolicy::new(3, Duration::from_secs(u64::MAX), 2.0);
        assert_eq!(long_base.delay_after(1), MAX_BACKOFF);

        let no_delay = RetryPolicy::new(u32::MAX, Duration::ZERO, 10.0);
        assert_eq!(no_delay.delay_after(u32::MAX), Duration::ZERO);
    }

    #[test]
    fn test_degenerate_parameters_are_clamped() {
        let policy = RetryPolicy::new(0, Duration::from_millis(10), 0.5);
        assert_eq!(policy.max_attempts(), 1);
        assert_eq!(policy.delay_after(3), Duration::from_millis(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_waits_between_attempts() {
        let calls = Arc::new(AtomicU32::new(0));
        let policy = RetryPolicy::new(3, Duration::from_secs(1), 2.0);
        let start = tokio::time::Instant::now();

        let result = policy.run("test_op", flaky(calls.clone(), 2)).await;

        assert_eq!(result.unwrap(), 42);
        // 1s after the first failure, 2s after the second
        assert!(start.elapsed() >= Duration::from_secs(3));
    }

    #[test]
    fn test_default_matches_config_defaults() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts(), 2);
        assert_eq!(policy.delay_after(1), Duration::from_millis(500));
    }
}
