//! Row-by-row extraction over a document set, with cooperative abort.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use super::engine::ExtractionEngine;
use crate::model::ModelClient;
use crate::types::{Document, ExtractionField, ExtractionResult, ModelId};

/// Cloneable abort flag for one bulk run.
///
/// Checked before each row and before each field; a call already in flight
/// runs to completion.
#[derive(Debug, Clone, Default)]
pub struct AbortToken(Arc<AtomicBool>);

impl AbortToken {
    /// A fresh, un-aborted token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests the run to stop at the next check.
    pub fn abort(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether [`abort`](Self::abort) has been called.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Outcome of one (document, field) cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CellOutcome {
    /// The cell was extracted and awaits review.
    Extracted(ExtractionResult),
    /// The cell failed; the run moved on.
    Failed {
        /// Error message.
        error: String,
        /// Short marker to show in the cell.
        placeholder: String,
    },
}

/// One finished cell, as published to progress listeners.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellUpdate {
    /// Row.
    pub document_id: String,
    /// Column.
    pub field_id: String,
    /// What happened.
    pub outcome: CellOutcome,
}

impl CellUpdate {
    /// Text to render in the cell.
    #[must_use]
    pub fn display_value(&self) -> &str {
        match &self.outcome {
            CellOutcome::Extracted(result) => &result.value,
            CellOutcome::Failed { placeholder, .. } => placeholder,
        }
    }
}

/// Summary of a bulk run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkReport {
    /// Every cell attempted, in run order.
    pub cells: Vec<CellUpdate>,
    /// Whether the run stopped early because of the abort token.
    pub aborted: bool,
}

impl BulkReport {
    /// Successfully extracted results.
    pub fn results(&self) -> impl Iterator<Item = &ExtractionResult> {
        self.cells.iter().filter_map(|c| match &c.outcome {
            CellOutcome::Extracted(r) => Some(r),
            CellOutcome::Failed { .. } => None,
        })
    }

    /// Cells that failed.
    pub fn failures(&self) -> impl Iterator<Item = &CellUpdate> {
        self.cells
            .iter()
            .filter(|c| matches!(c.outcome, CellOutcome::Failed { .. }))
    }
}

/// Extracts every field of every document, rows in order and fields in order.
///
/// A failing cell is recorded and the run continues. Each finished cell is
/// also sent to `progress`, if given; a closed receiver does not stop the run.
pub async fn run_bulk<C: ModelClient>(
    engine: &ExtractionEngine<C>,
    documents: &[Document],
    fields: &[ExtractionField],
    model: &ModelId,
    abort: &AbortToken,
    mut progress: Option<mpsc::Sender<CellUpdate>>,
) -> BulkReport {
    tracing::info!(
        documents = documents.len(),
        fields = fields.len(),
        model = %model,
        "starting bulk extraction"
    );

    let mut report = BulkReport::default();

    'rows: for document in documents {
        if abort.is_aborted() {
            report.aborted = true;
            break;
        }
        for field in fields {
            if abort.is_aborted() {
                report.aborted = true;
                break 'rows;
            }

            let outcome = match engine.extract(document, field, model).await {
                Ok(result) => CellOutcome::Extracted(result),
                Err(e) => {
                    tracing::warn!(
                        document_id = %document.id,
                        field_id = %field.id,
                        error = %e,
                        "cell extraction failed"
                    );
                    CellOutcome::Failed {
                        error: e.to_string(),
                        placeholder: e.cell_placeholder().to_string(),
                    }
                }
            };
            let update = CellUpdate {
                document_id: document.id.clone(),
                field_id: field.id.clone(),
                outcome,
            };

            if let Some(tx) = &progress {
                if tx.send(update.clone()).await.is_err() {
                    tracing::debug!("progress receiver dropped, continuing without updates");
                    progress = None;
                }
            }
            report.cells.push(update);
        }
    }

    tracing::info!(
        cells = report.cells.len(),
        failures = report.failures().count(),
        aborted = report.aborted,
        "bulk extraction finished"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abort_token_is_shared_between_clones() {
        let token = AbortToken::new();
        let clone = token.clone();
        assert!(!clone.is_aborted());
        token.abort();
        assert!(clone.is_aborted());
    }

    #[test]
    fn failed_cell_displays_placeholder() {
        let update = CellUpdate {
            document_id: "d".into(),
            field_id: "f".into(),
            outcome: CellOutcome::Failed {
                error: "boom".into(),
                placeholder: "#ERROR".into(),
            },
        };
        assert_eq!(update.display_value(), "#ERROR");
    }
}
