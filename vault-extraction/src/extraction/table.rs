//! CSV rendering of extraction results for data questions.

use std::borrow::Cow;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::types::{Document, ExtractionField, ExtractionResult};

/// Everything known about a set of documents, as input to a data question.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataContext {
    /// Table rows, in display order.
    pub documents: Vec<Document>,
    /// Table columns, in display order.
    pub fields: Vec<ExtractionField>,
    /// Extracted cells. Cells without a result render empty.
    pub results: Vec<ExtractionResult>,
}

impl DataContext {
    /// Renders the context as CSV: header `Document,<field names>`, one row per document.
    ///
    /// Cells containing a comma, quote or line break are quoted with inner
    /// quotes doubled.
    ///
    /// # Examples
    ///
    /// ```
    /// use vault_extraction::extraction::DataContext;
    /// use vault_extraction::types::{Document, ExtractionField, FieldType};
    ///
    /// let context = DataContext {
    ///     documents: vec![Document::new("lease.pdf", "...")],
    ///     fields: vec![ExtractionField::new("rent", "Rent", FieldType::Number, "Monthly rent")],
    ///     results: vec![],
    /// };
    /// assert_eq!(context.to_csv(), "Document,Rent\nlease.pdf,\n");
    /// ```
    #[must_use]
    pub fn to_csv(&self) -> String {
        let cells: HashMap<(&str, &str), &str> = self
            .results
            .iter()
            .map(|r| ((r.document_id.as_str(), r.field_id.as_str()), r.value.as_str()))
            .collect();

        let mut out = String::from("Document");
        for field in &self.fields {
            out.push(',');
            out.push_str(&escape_cell(&field.name));
        }
        out.push('\n');

        for doc in &self.documents {
            out.push_str(&escape_cell(&doc.id));
            for field in &self.fields {
                out.push(',');
                if let Some(value) = cells.get(&(doc.id.as_str(), field.id.as_str())) {
                    out.push_str(&escape_cell(value));
                }
            }
            out.push('\n');
        }
        out
    }
}

fn escape_cell(cell: &str) -> Cow<'_, str> {
    if cell.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", cell.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(cell)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Confidence, FieldType, ReviewStatus};

    fn result(doc: &str, field: &str, value: &str) -> ExtractionResult {
        ExtractionResult {
            field_id: field.into(),
            document_id: doc.into(),
            value: value.into(),
            confidence: Confidence::High,
            quote: String::new(),
            page: Some(1),
            reasoning: String::new(),
            status: ReviewStatus::NeedsReview,
        }
    }

    #[test]
    fn renders_rows_in_document_order_with_gaps() {
        let context = DataContext {
            documents: vec![Document::new("a.pdf", ""), Document::new("b.pdf", "")],
            fields: vec![
                ExtractionField::new("party", "Party", FieldType::ShortText, ""),
                ExtractionField::new("rent", "Rent", FieldType::Number, ""),
            ],
            results: vec![result("b.pdf", "rent", "900"), result("a.pdf", "party", "Acme")],
        };
        assert_eq!(context.to_csv(), "Document,Party,Rent\na.pdf,Acme,\nb.pdf,,900\n");
    }

    #[test]
    fn quotes_cells_with_separators() {
        assert_eq!(escape_cell("plain"), "plain");
        assert_eq!(escape_cell("Smith, John"), "\"Smith, John\"");
        assert_eq!(escape_cell("the \"Tenant\""), "\"the \"\"Tenant\"\"\"");
        assert_eq!(escape_cell("line\nbreak"), "\"line\nbreak\"");
    }
}
