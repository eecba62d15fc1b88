//! Centralized retry-with-backoff policy.
//!
//! Per the design notes, "retries scattered through code" is the one
//! source-language pattern explicitly called out for re-architecture: this
//! module is the *only* place I/O retries happen in the crate. Its sole
//! caller is the skeleton store's `save()`.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::time::sleep;
use tracing::warn;

/// Implemented by error types that can classify themselves as transient.
pub trait Retryable {
    fn is_recoverable(&self) -> bool;
}

/// Counters for how often retries succeeded or ultimately failed.
#[derive(Debug, Default)]
pub struct RetryMetrics {
    total: AtomicU64,
    success: AtomicU64,
    failure: AtomicU64,
}

impl RetryMetrics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_retry(&self, succeeded: bool) {
        self.total.fetch_add(1, Ordering::SeqCst);
        if succeeded {
            self.success.fetch_add(1, Ordering::SeqCst);
        } else {
            self.failure.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[must_use]
    pub fn total(&self) -> u64 {
        self.total.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn success_count(&self) -> u64 {
        self.success.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn failure_count(&self) -> u64 {
        self.failure.load(Ordering::SeqCst)
    }
}

/// Backoff schedule and budget for [`RetryPolicy`].
///
/// The skeleton store's save retry (§4.A) uses the default unchanged:
/// `max_retries` counts *retries*, not total tries — the initial call to
/// `operation` in [`RetryPolicy::execute`] always runs once with no delay
/// before it, then up to `max_retries` further tries follow the backoff
/// schedule below (200 ms, doubling to 400 ms then 800 ms). §4.A's "up to 3
/// attempts, back-off 200 ms -> 400 ms -> 800 ms" is read here as 3 retries
/// after the initial write, i.e. 4 write attempts total in the worst case —
/// the chosen reading given the three listed backoff delays describe three
/// distinct waits, not two.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub jitter_factor: f64,
    pub max_retry_budget: Option<u32>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
            jitter_factor: 0.0,
            max_retry_budget: None,
        }
    }
}

impl RetryConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    #[must_use]
    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    #[must_use]
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    #[must_use]
    pub fn with_jitter(mut self, factor: f64) -> Self {
        self.jitter_factor = factor;
        self
    }

    #[must_use]
    pub fn with_retry_budget(mut self, budget: u32) -> Self {
        self.max_retry_budget = Some(budget);
        self
    }
}

pub struct RetryPolicy {
    config: RetryConfig,
    metrics: Option<RetryMetrics>,
    retry_budget: Option<NonZeroBudget>,
}

struct NonZeroBudget {
    remaining: u32,
}

impl RetryPolicy {
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: RetryConfig::default(),
            metrics: None,
            retry_budget: None,
        }
    }

    #[must_use]
    pub fn with_config(config: RetryConfig) -> Self {
        let retry_budget = config
            .max_retry_budget
            .map(|b| NonZeroBudget { remaining: b });
        Self {
            config,
            metrics: None,
            retry_budget,
        }
    }

    #[must_use]
    pub fn with_metrics(mut self, metrics: RetryMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// The delay schedule this policy would use, were it to retry exactly
    /// `config.max_retries` times. Exposed for tests (S4, save-retry tests).
    #[must_use]
    pub fn schedule(&self) -> Vec<Duration> {
        (1..=self.config.max_retries)
            .map(|attempt| self.calculate_delay(attempt))
            .collect()
    }

    fn calculate_delay(&self, attempt: u32) -> Duration {
        let exp_delay = self.config.base_delay * 2u32.pow(attempt.saturating_sub(1));
        let delay = std::cmp::min(exp_delay, self.config.max_delay);

        if self.config.jitter_factor > 0.0 {
            let jitter_range = delay.as_millis() as f64 * self.config.jitter_factor;
            let jitter = (rand::random::<f64>() - 0.5) * 2.0 * jitter_range;
            let adjusted_ms = (delay.as_millis() as f64 + jitter).max(0.0);
            Duration::from_millis(adjusted_ms as u64)
        } else {
            delay
        }
    }

    fn can_retry(&mut self) -> bool {
        if let Some(ref mut budget) = self.retry_budget {
            if budget.remaining == 0 {
                return false;
            }
            budget.remaining = budget.remaining.saturating_sub(1);
        }
        true
    }

    fn record_success(&self, attempt: u32) {
        if attempt > 0 {
            if let Some(ref metrics) = self.metrics {
                metrics.record_retry(true);
            }
        }
    }

    fn record_failure(&self, attempt: u32) {
        if attempt > 0 {
            if let Some(ref metrics) = self.metrics {
                metrics.record_retry(false);
            }
        }
    }

    /// Run `operation` until it succeeds, the error is non-recoverable, or
    /// the retry budget/attempt count is exhausted — whichever comes first.
    pub async fn execute<F, T, E, Fut>(&mut self, operation: F) -> std::result::Result<T, E>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        E: Retryable + std::error::Error + Send + Sync + 'static,
        E: std::fmt::Debug,
    {
        let mut attempt = 0;

        loop {
            match operation().await {
                Ok(result) => {
                    self.record_success(attempt);
                    return Ok(result);
                }
                Err(e) => {
                    let is_recoverable = e.is_recoverable();

                    if !is_recoverable || !self.can_retry() || attempt >= self.config.max_retries {
                        self.record_failure(attempt);
                        return Err(e);
                    }

                    attempt += 1;
                    let delay = self.calculate_delay(attempt);
                    self.record_failure(attempt);

                    warn!(
                        attempt,
                        max_retries = self.config.max_retries,
                        ?delay,
                        error = ?e,
                        "retry attempt failed, retrying"
                    );

                    sleep(delay).await;
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("boom")]
    struct Boom(bool);

    impl Retryable for Boom {
        fn is_recoverable(&self) -> bool {
            self.0
        }
    }

    #[test]
    fn schedule_matches_spec_backoff() {
        let policy = RetryPolicy::with_config(RetryConfig::new().with_max_retries(3));
        let schedule = policy.schedule();
        assert_eq!(
            schedule,
            vec![
                Duration::from_millis(200),
                Duration::from_millis(400),
                Duration::from_millis(800),
            ]
        );
    }

    #[tokio::test]
    async fn non_recoverable_errors_never_retry() {
        let mut policy = RetryPolicy::with_config(RetryConfig::new().with_max_retries(3));
        let attempts = std::sync::atomic::AtomicU32::new(0);
        let result: std::result::Result<(), Boom> = policy
            .execute(|| async {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err(Boom(false))
            })
            .await;
        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn recoverable_errors_retry_up_to_max() {
        let mut policy = RetryPolicy::with_config(
            RetryConfig::new()
                .with_max_retries(3)
                .with_base_delay(Duration::from_millis(1)),
        );
        let attempts = std::sync::atomic::AtomicU32::new(0);
        let result: std::result::Result<(), Boom> = policy
            .execute(|| async {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err(Boom(true))
            })
            .await;
        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let mut policy = RetryPolicy::with_config(
            RetryConfig::new()
                .with_max_retries(3)
                .with_base_delay(Duration::from_millis(1)),
        );
        let attempts = std::sync::atomic::AtomicU32::new(0);
        let result = policy
            .execute(|| async {
                let n = attempts.fetch_add(1, Ordering::SeqCst);
                if n < 2 { Err(Boom(true)) } else { Ok(42) }
            })
            .await;
        assert_eq!(result.unwrap(), 42);
    }
}
