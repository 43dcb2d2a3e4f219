//! Domain types shared by the extraction engine, bulk runs and callers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Model used when a caller does not pick one.
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Identifier of a provider model (e.g. `"gemini-2.0-flash"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelId(String);

impl ModelId {
    /// Wraps a model name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The model name as sent to the provider.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ModelId {
    fn default() -> Self {
        Self(DEFAULT_MODEL.to_string())
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ModelId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for ModelId {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// A source document as returned by the document store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Stable document identifier.
    pub id: String,
    /// Full extracted text of the document.
    pub text: String,
}

impl Document {
    /// Creates a document from an id and its text.
    #[must_use]
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }
}

/// How an extracted value must be formatted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FieldType {
    /// A few words.
    ShortText,
    /// One or more sentences.
    LongText,
    /// A bare number.
    Number,
    /// A calendar date.
    Date,
    /// A yes/no answer.
    Boolean,
    /// Several items.
    List,
    /// A reference to a file or attachment.
    File,
}

impl FieldType {
    /// All field types, in display order.
    pub const ALL: [Self; 7] = [
        Self::ShortText,
        Self::LongText,
        Self::Number,
        Self::Date,
        Self::Boolean,
        Self::List,
        Self::File,
    ];

    /// The kebab-case wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ShortText => "short-text",
            Self::LongText => "long-text",
            Self::Number => "number",
            Self::Date => "date",
            Self::Boolean => "boolean",
            Self::List => "list",
            Self::File => "file",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FieldType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown field type: {s}"))
    }
}

/// A named, typed piece of information to pull out of a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionField {
    /// Stable field identifier.
    pub id: String,
    /// Column name shown to users.
    pub name: String,
    /// Formatting contract for the value.
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// What to extract, in the user's words.
    pub prompt_instruction: String,
}

impl ExtractionField {
    /// Creates a field definition.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        field_type: FieldType,
        prompt_instruction: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            field_type,
            prompt_instruction: prompt_instruction.into(),
        }
    }
}

/// Self-reported certainty of an extracted value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Confidence {
    /// Stated explicitly in the document.
    High,
    /// Inferred from nearby context.
    Medium,
    /// Guessed, or not reported.
    #[default]
    Low,
}

impl Confidence {
    /// Parses a provider label, falling back to [`Confidence::Low`].
    #[must_use]
    pub fn parse_lenient(label: Option<&str>) -> Self {
        match label.map(|l| l.trim().to_ascii_lowercase()).as_deref() {
            Some("high") => Self::High,
            Some("medium") => Self::Medium,
            _ => Self::Low,
        }
    }

    /// The label used on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
        }
    }
}

/// Human review state of an extraction cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    /// Not yet extracted.
    Pending,
    /// Extracted, waiting for a reviewer.
    NeedsReview,
    /// Confirmed by a reviewer.
    Verified,
}

/// Structured, cited answer for one (document, field) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    /// Field this value answers.
    pub field_id: String,
    /// Document the value was taken from.
    pub document_id: String,
    /// Formatted value.
    pub value: String,
    /// Self-reported certainty.
    pub confidence: Confidence,
    /// Verbatim excerpt offered as evidence. May be empty.
    pub quote: String,
    /// Page the quote appears on.
    pub page: Option<u32>,
    /// Model explanation of how the value was found.
    pub reasoning: String,
    /// Review state.
    pub status: ReviewStatus,
}

impl ExtractionResult {
    /// Marks the cell as confirmed by a reviewer.
    pub fn verify(&mut self) {
        self.status = ReviewStatus::Verified;
    }

    /// Checks the quote against the source text, returning its first byte range.
    ///
    /// Returns `None` for an empty quote or when the quote cannot be found.
    #[must_use]
    pub fn locate_quote(&self, source_text: &str) -> Option<std::ops::Range<usize>> {
        crate::citation::locate(source_text, &self.quote)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_type_round_trips_through_kebab_case() {
        let json = serde_json::to_string(&FieldType::ShortText).unwrap();
        assert_eq!(json, "\"short-text\"");
        assert_eq!("long-text".parse::<FieldType>().unwrap(), FieldType::LongText);
        assert_eq!(" DATE ".parse::<FieldType>().unwrap(), FieldType::Date);
        assert!("currency".parse::<FieldType>().is_err());
    }

    #[test]
    fn confidence_parse_is_lenient() {
        assert_eq!(Confidence::parse_lenient(Some("High")), Confidence::High);
        assert_eq!(Confidence::parse_lenient(Some(" medium ")), Confidence::Medium);
        assert_eq!(Confidence::parse_lenient(Some("certain")), Confidence::Low);
        assert_eq!(Confidence::parse_lenient(None), Confidence::Low);
    }

    #[test]
    fn field_deserializes_from_camel_case() {
        let field: ExtractionField = serde_json::from_str(
            r#"{"id":"f1","name":"Effective date","type":"date","promptInstruction":"When does it start?"}"#,
        )
        .unwrap();
        assert_eq!(field.field_type, FieldType::Date);
        assert_eq!(field.prompt_instruction, "When does it start?");
    }

    #[test]
    fn verify_moves_status_to_verified() {
        let mut result = ExtractionResult {
            field_id: "f".into(),
            document_id: "d".into(),
            value: "42".into(),
            confidence: Confidence::High,
            quote: "the answer is 42".into(),
            page: Some(1),
            reasoning: String::new(),
            status: ReviewStatus::NeedsReview,
        };
        result.verify();
        assert_eq!(result.status, ReviewStatus::Verified);
        assert_eq!(result.locate_quote("We know the answer  is 42."), Some(8..25));
    }

    #[test]
    fn model_id_defaults_to_flash() {
        assert_eq!(ModelId::default().as_str(), DEFAULT_MODEL);
        assert_eq!(ModelId::from("gemini-1.5-pro").to_string(), "gemini-1.5-pro");
    }
}
