//! Structured, cited field extraction.
//!
//! - [`ExtractionEngine`] - Single-field extraction, prompt hints and data questions
//! - [`run_bulk`] - Row-by-row extraction over a document set with an [`AbortToken`]
//! - [`ExtractionError`] - Malformed responses, exhausted retries, provider failures
//! - [`ExtractionMetrics`] - Attempt, token and timing metrics
//! - [`ExtractionConfig`] - Retry policy and default model
//! - [`DataContext`] - Results rendered as a CSV table for data questions

pub mod bulk;
pub mod config;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod prompt;
pub mod table;

pub use bulk::{run_bulk, AbortToken, BulkReport, CellOutcome, CellUpdate};
pub use config::ExtractionConfig;
pub use engine::{ExtractionEngine, DATA_QUESTION_APOLOGY};
pub use error::ExtractionError;
pub use metrics::{estimate_tokens, ExtractionMetrics};
pub use table::DataContext;
