//! Bounded exponential backoff for rate-limited provider calls.
//!
//! Only errors that carry a rate-limit or quota signal are retried. Everything
//! else is handed back on the first failure, without sleeping.

use std::future::Future;
use std::sync::OnceLock;
use std::time::Duration;

use rand::Rng;
use regex::Regex;
use thiserror::Error;

/// Upper bound (exclusive) of the random jitter added to each delay.
pub const MAX_JITTER: Duration = Duration::from_millis(1000);

/// Retry budget and base delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries allowed after the first attempt (`0` = single attempt).
    pub max_attempts: u32,
    /// Delay before the first retry; doubles on every further retry.
    pub initial_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    /// Creates a policy from a retry count and an initial delay in milliseconds.
    #[must_use]
    pub const fn new(max_attempts: u32, initial_delay_ms: u64) -> Self {
        Self {
            max_attempts,
            initial_delay: Duration::from_millis(initial_delay_ms),
        }
    }

    /// Deterministic part of the delay before retry `retry` (1-indexed).
    #[must_use]
    pub fn base_delay(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(31);
        self.initial_delay.saturating_mul(1u32 << exponent)
    }
}

/// Implemented by errors that can tell whether they were caused by rate limiting.
pub trait RateLimitSignal {
    /// `true` when the failure is a rate-limit/quota rejection worth retrying.
    fn is_rate_limited(&self) -> bool;
}

const RATE_LIMIT_PATTERN: &str =
    r"(?i)\b429\b|rate[\s_-]?limit|quota|resource[\s_-]?exhausted|too many requests";

fn rate_limit_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| match Regex::new(RATE_LIMIT_PATTERN) {
            Ok(re) => Some(re),
            Err(e) => {
                tracing::error!(error = %e, "rate limit pattern failed to compile");
                None
            }
        })
        .as_ref()
}

/// Checks a status code, error code or message for a rate-limit/quota marker.
///
/// Reports `false` if the marker pattern is unavailable.
#[must_use]
pub fn looks_rate_limited(text: &str) -> bool {
    rate_limit_pattern().is_some_and(|re| re.is_match(text))
}

/// Failure returned by [`RetryExecutor::execute`].
#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// Every attempt was rate limited.
    #[error("gave up after {attempts} rate-limited attempts: {last}")]
    Exhausted {
        /// Attempts made, including the first.
        attempts: u32,
        /// Error from the final attempt.
        last: E,
    },

    /// The operation failed with an error that is not retried.
    #[error("{0}")]
    NonRetryable(E),
}

impl<E> RetryError<E> {
    /// The underlying error, whichever way the call failed.
    pub fn into_inner(self) -> E {
        match self {
            Self::Exhausted { last, .. } | Self::NonRetryable(last) => last,
        }
    }
}

/// Wraps an async operation with rate-limit-aware retries.
#[derive(Debug, Clone, Copy, Default)]
pub struct RetryExecutor {
    policy: RetryPolicy,
}

impl RetryExecutor {
    /// Creates an executor for the given policy.
    #[must_use]
    pub const fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    /// The policy this executor applies.
    #[must_use]
    pub const fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Runs `operation` until it succeeds, fails without a rate-limit signal,
    /// or the retry budget is spent.
    ///
    /// # Errors
    /// Returns [`RetryError::NonRetryable`] on the first non rate-limit failure
    /// and [`RetryError::Exhausted`] once `max_attempts + 1` attempts failed.
    pub async fn execute<T, E, F, Fut>(&self, operation: F) -> Result<T, RetryError<E>>
    where
        E: RateLimitSignal + std::fmt::Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.execute_counted(operation).await.map(|(value, _)| value)
    }

    /// Same as [`execute`](Self::execute) but also reports how many attempts were made.
    ///
    /// # Errors
    /// See [`execute`](Self::execute).
    pub async fn execute_counted<T, E, F, Fut>(
        &self,
        mut operation: F,
    ) -> Result<(T, u32), RetryError<E>>
    where
        E: RateLimitSignal + std::fmt::Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempt: u32 = 1;
        loop {
            match operation().await {
                Ok(value) => return Ok((value, attempt)),
                Err(err) if !err.is_rate_limited() => return Err(RetryError::NonRetryable(err)),
                Err(err) => {
                    if attempt > self.policy.max_attempts {
                        return Err(RetryError::Exhausted {
                            attempts: attempt,
                            last: err,
                        });
                    }

                    let delay = self.policy.base_delay(attempt) + jitter();
                    tracing::warn!(
                        attempt,
                        max_retries = self.policy.max_attempts,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %err,
                        "rate limited, backing off before retry"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

fn jitter() -> Duration {
    let max_ms = u64::try_from(MAX_JITTER.as_millis()).unwrap_or(1000);
    Duration::from_millis(rand::thread_rng().gen_range(0..max_ms))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Flaky(bool);

    impl RateLimitSignal for Flaky {
        fn is_rate_limited(&self) -> bool {
            self.0
        }
    }

    impl std::fmt::Display for Flaky {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "flaky(rate_limited={})", self.0)
        }
    }

    #[test]
    fn base_delay_doubles() {
        let policy = RetryPolicy::new(5, 100);
        assert_eq!(policy.base_delay(1), Duration::from_millis(100));
        assert_eq!(policy.base_delay(2), Duration::from_millis(200));
        assert_eq!(policy.base_delay(4), Duration::from_millis(800));
    }

    #[test]
    fn default_policy_matches_extraction_defaults() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.initial_delay, Duration::from_millis(1000));
    }

    #[test]
    fn rate_limit_pattern_compiles() {
        assert!(rate_limit_pattern().is_some());
    }

    #[test]
    fn rate_limit_markers() {
        assert!(looks_rate_limited("HTTP 429 Too Many Requests"));
        assert!(looks_rate_limited("RESOURCE_EXHAUSTED"));
        assert!(looks_rate_limited("Rate limit reached for requests"));
        assert!(looks_rate_limited("You exceeded your current quota"));
        assert!(!looks_rate_limited("invalid argument"));
        assert!(!looks_rate_limited("request id 14290"));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_retries_means_single_attempt() {
        let executor = RetryExecutor::new(RetryPolicy::new(0, 50));
        let mut calls = 0;
        let result: Result<(), _> = executor
            .execute(|| {
                calls += 1;
                async { Err(Flaky(true)) }
            })
            .await;
        assert_eq!(calls, 1);
        assert!(matches!(result, Err(RetryError::Exhausted { attempts: 1, .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_after_transient_failures() {
        let executor = RetryExecutor::new(RetryPolicy::new(3, 10));
        let mut calls = 0;
        let result = executor
            .execute_counted(|| {
                calls += 1;
                let outcome = if calls < 3 { Err(Flaky(true)) } else { Ok("done") };
                async move { outcome }
            })
            .await
            .unwrap();
        assert_eq!(result, ("done", 3));
    }

    #[tokio::test(start_paused = true)]
    async fn into_inner_returns_last_error() {
        let executor = RetryExecutor::new(RetryPolicy::new(1, 10));
        let err = executor
            .execute(|| async { Err::<(), _>(Flaky(true)) })
            .await
            .unwrap_err();
        assert!(err.into_inner().0);
    }
}
