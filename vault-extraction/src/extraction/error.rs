//! Error types for extraction operations.

use thiserror::Error;

use crate::model::ModelError;
use crate::retry::RetryError;

/// Errors that can occur while extracting one (document, field) pair.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// The provider answered, but not with the declared response shape.
    #[error("Malformed extraction response: {reason}")]
    Malformed {
        /// Short description of what was wrong.
        reason: String,
        /// Every schema violation, with its instance path.
        errors: Vec<String>,
        /// Raw response text for debugging.
        raw: String,
    },

    /// Every attempt was rejected by the provider's rate limiter.
    #[error("Extraction failed after {attempts} rate-limited attempts: {source}")]
    ExhaustedRetries {
        /// Attempts made, including the first.
        attempts: u32,
        /// Error from the final attempt.
        #[source]
        source: ModelError,
    },

    /// The provider call failed for a reason that is not retried.
    #[error("Model provider error: {0}")]
    Provider(#[source] ModelError),

    /// The response schema could not be compiled.
    #[error("Schema error: {0}")]
    Schema(String),
}

impl ExtractionError {
    /// Builds a [`ExtractionError::Malformed`] with no schema errors.
    pub(crate) fn malformed(reason: impl Into<String>, raw: impl Into<String>) -> Self {
        Self::Malformed {
            reason: reason.into(),
            errors: Vec::new(),
            raw: raw.into(),
        }
    }

    /// Short placeholder shown in a table cell that failed.
    #[must_use]
    pub const fn cell_placeholder(&self) -> &'static str {
        match self {
            Self::Malformed { .. } => "#MALFORMED",
            Self::ExhaustedRetries { .. } => "#RATE_LIMITED",
            Self::Provider(_) | Self::Schema(_) => "#ERROR",
        }
    }
}

impl From<RetryError<ModelError>> for ExtractionError {
    fn from(err: RetryError<ModelError>) -> Self {
        match err {
            RetryError::Exhausted { attempts, last } => Self::ExhaustedRetries {
                attempts,
                source: last,
            },
            RetryError::NonRetryable(e) => Self::Provider(e),
        }
    }
}
