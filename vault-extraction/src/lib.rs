//! Extraction core for the vault AI pipeline.
//!
//! This crate turns unstructured document text into structured, cited answers.
//! It owns the rate-limit aware [`retry`] executor, the [`citation`] matcher
//! used to highlight evidence, and the [`extraction`] engine. Providers plug in
//! through the [`model::ModelClient`] trait.

pub mod citation;
pub mod extraction;
pub mod model;
pub mod retry;
pub mod store;
pub mod types;

/// Common traits and types for ergonomic usage of the extraction core.
pub mod prelude {
    pub use crate::citation::{highlight, locate, Highlight, Segment};
    pub use crate::extraction::{
        run_bulk, AbortToken, BulkReport, CellOutcome, CellUpdate, DataContext, ExtractionConfig,
        ExtractionEngine, ExtractionError, ExtractionMetrics,
    };
    pub use crate::model::{ModelClient, ModelError, ModelRequest, Turn, TurnRole};
    pub use crate::retry::{RateLimitSignal, RetryError, RetryExecutor, RetryPolicy};
    pub use crate::store::{DocumentStore, MemoryStore, StoreError};
    pub use crate::types::{
        Confidence, Document, ExtractionField, ExtractionResult, FieldType, ModelId, ReviewStatus,
    };
}
