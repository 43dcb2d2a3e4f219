//! Configuration for extraction calls.

use crate::retry::RetryPolicy;
use crate::types::ModelId;

/// Configuration shared by every call an [`ExtractionEngine`](super::ExtractionEngine) makes.
#[derive(Debug, Clone, Default)]
pub struct ExtractionConfig {
    /// Backoff applied to every provider call (default: 5 retries, 1000ms).
    pub retry: RetryPolicy,
    /// Model used by callers that do not name one.
    pub default_model: ModelId,
}

impl ExtractionConfig {
    /// Set the retry policy.
    #[must_use]
    pub const fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Set the number of retries after the first attempt.
    #[must_use]
    pub const fn with_max_attempts(mut self, max: u32) -> Self {
        self.retry.max_attempts = max;
        self
    }

    /// Set the default model.
    #[must_use]
    pub fn with_default_model(mut self, model: impl Into<ModelId>) -> Self {
        self.default_model = model.into();
        self
    }
}
