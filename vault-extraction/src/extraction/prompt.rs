//! Prompt and schema builders for extraction, prompt hints and data questions.

use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::types::{Document, ExtractionField, FieldType};

/// System instruction for single-field extraction.
pub const EXTRACTION_SYSTEM_INSTRUCTION: &str = "You are a meticulous document analyst. \
Answer only from the document you are given. The quote you return must be copied verbatim \
from the document, never paraphrased. If the document does not contain the answer, say so \
in the value and use Low confidence.";

/// System instruction for prompt-hint generation.
pub const HINT_SYSTEM_INSTRUCTION: &str = "You write short, precise instructions that tell a \
document analyst which value to extract. Reply with the instruction only, one or two sentences, \
no preamble.";

/// Formatting rule appended to the extraction prompt for a field type.
#[must_use]
pub const fn format_directive(field_type: FieldType) -> &'static str {
    match field_type {
        FieldType::Date => "Format the value as an ISO date: YYYY-MM-DD.",
        FieldType::Boolean => "The value must be exactly \"true\" or \"false\".",
        FieldType::Number => {
            "The value must be a bare number. Remove currency symbols, units and thousands separators."
        }
        FieldType::List => "Return every item, joined with \", \" (comma and space).",
        FieldType::ShortText => "Keep the value to a few words.",
        FieldType::LongText => "The value may be one or more complete sentences.",
        FieldType::File => "The value is the name or reference of the file or attachment.",
    }
}

/// Builds the user turn for extracting `field` from `document`.
#[must_use]
pub fn build_extraction_prompt(document: &Document, field: &ExtractionField) -> String {
    format!(
        "Document:\n\"\"\"\n{text}\n\"\"\"\n\n\
         Field: {name}\n\
         Instruction: {instruction}\n\
         Format: {directive}\n\n\
         Respond with JSON containing value, confidence (High, Medium or Low), \
         a verbatim quote from the document, the page the quote appears on, and your reasoning.",
        text = document.text,
        name = field.name,
        instruction = field.prompt_instruction,
        directive = format_directive(field.field_type),
    )
}

/// Response shape declared to the provider, in its OpenAPI schema dialect.
#[must_use]
pub fn provider_response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "value": {"type": "STRING"},
            "confidence": {"type": "STRING", "enum": ["High", "Medium", "Low"]},
            "quote": {"type": "STRING"},
            "page": {"type": "INTEGER"},
            "reasoning": {"type": "STRING"}
        },
        "required": ["value", "confidence", "quote", "reasoning"]
    })
}

/// Lenient view of a provider answer, used to derive the validation schema.
///
/// Only the fields the result cannot be built without are required; the rest
/// are normalized by the engine.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WireExtraction {
    /// Formatted value.
    pub value: String,
    /// Verbatim evidence.
    pub quote: String,
    /// Explanation of how the value was found.
    pub reasoning: String,
    /// `High`, `Medium` or `Low`, in any case; anything else reads as `Low`.
    #[serde(default)]
    pub confidence: Option<Value>,
    /// Page number; integers and numeric strings are accepted.
    #[serde(default)]
    pub page: Option<Value>,
}

/// JSON Schema that a provider answer is validated against.
///
/// # Errors
/// Returns the serialization error if the generated schema cannot be turned into JSON.
pub fn validation_schema() -> Result<Value, serde_json::Error> {
    serde_json::to_value(schema_for!(WireExtraction))
}

/// Collect all validation errors from jsonschema validation.
///
/// Returns a vector of formatted error strings with instance paths.
/// Uses `iter_errors()` to collect ALL validation failures, not just the first.
///
/// # Examples
///
/// ```
/// use vault_extraction::extraction::prompt::collect_validation_errors;
/// use serde_json::json;
///
/// let schema = json!({
///     "type": "object",
///     "properties": {"value": {"type": "string"}},
///     "required": ["value"]
/// });
///
/// let errors = collect_validation_errors(&schema, &json!({"value": 7}));
/// assert_eq!(errors.len(), 1);
/// ```
#[must_use]
pub fn collect_validation_errors(schema: &Value, instance: &Value) -> Vec<String> {
    match jsonschema::Validator::new(schema) {
        Ok(validator) => validator
            .iter_errors(instance)
            .map(|error| format!("At path '{}': {}", error.instance_path, error))
            .collect(),
        Err(e) => vec![format!("Schema compilation error: {e}")],
    }
}

/// Builds the request for writing or refining a field instruction.
#[must_use]
pub fn build_hint_prompt(field_name: &str, field_type: FieldType, draft: Option<&str>) -> String {
    let mut prompt = format!(
        "Write an extraction instruction for a column named \"{field_name}\" of type {field_type}.\n\
         {}",
        format_directive(field_type)
    );
    match draft.map(str::trim).filter(|d| !d.is_empty()) {
        Some(draft) => {
            prompt.push_str("\n\nImprove this draft, keeping its intent:\n");
            prompt.push_str(draft);
        }
        None => prompt.push_str("\n\nThere is no draft yet; write one from scratch."),
    }
    prompt
}

/// Deterministic instruction used when hint generation fails.
#[must_use]
pub fn fallback_hint(field_name: &str) -> String {
    format!("Extract the {field_name} from the document.")
}

/// System instruction for answering a question from an extraction table.
#[must_use]
pub fn build_data_question_instruction(table: &str) -> String {
    format!(
        "You answer questions about a set of documents using only the extraction table below. \
         Answer strictly from this table. If the table does not contain the answer, say that \
         it does not.\n\nExtraction table (CSV):\n{table}"
    )
}
