//! Schema-constrained field extraction on top of a [`ModelClient`].

use std::sync::Arc;

use serde_json::Value;
use tokio::time::Instant;

use super::config::ExtractionConfig;
use super::error::ExtractionError;
use super::metrics::{estimate_tokens, estimate_tokens_from_chars, ExtractionMetrics};
use super::prompt::{
    build_data_question_instruction, build_extraction_prompt, build_hint_prompt,
    collect_validation_errors, fallback_hint, provider_response_schema, validation_schema,
    WireExtraction, EXTRACTION_SYSTEM_INSTRUCTION, HINT_SYSTEM_INSTRUCTION,
};
use super::table::DataContext;
use crate::model::{ModelClient, ModelRequest, Turn};
use crate::retry::RetryExecutor;
use crate::types::{
    Confidence, Document, ExtractionField, ExtractionResult, FieldType, ModelId, ReviewStatus,
};

/// Answer returned when a data question cannot be answered.
pub const DATA_QUESTION_APOLOGY: &str =
    "Sorry, I couldn't answer that from the extracted data. Please try again.";

/// Turns documents into structured, cited answers.
///
/// Cheap to clone; clones share the client. Calls are independent and may
/// run concurrently.
pub struct ExtractionEngine<C> {
    client: Arc<C>,
    config: ExtractionConfig,
}

impl<C> Clone for ExtractionEngine<C> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            config: self.config.clone(),
        }
    }
}

impl<C: ModelClient> ExtractionEngine<C> {
    /// Creates an engine with the default configuration.
    #[must_use]
    pub fn new(client: C) -> Self {
        Self::with_config(client, ExtractionConfig::default())
    }

    /// Creates an engine with the given configuration.
    #[must_use]
    pub fn with_config(client: C, config: ExtractionConfig) -> Self {
        Self::from_shared(Arc::new(client), config)
    }

    /// Creates an engine around a client that is already shared.
    #[must_use]
    pub const fn from_shared(client: Arc<C>, config: ExtractionConfig) -> Self {
        Self { client, config }
    }

    /// The configuration in use.
    #[must_use]
    pub const fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Extracts `field` from `document`.
    ///
    /// # Errors
    /// See [`extract_with_metrics`](Self::extract_with_metrics).
    pub async fn extract(
        &self,
        document: &Document,
        field: &ExtractionField,
        model: &ModelId,
    ) -> Result<ExtractionResult, ExtractionError> {
        self.extract_with_metrics(document, field, model)
            .await
            .map(|(result, _)| result)
    }

    /// Extracts `field` from `document` and reports call metrics.
    ///
    /// The result always starts in [`ReviewStatus::NeedsReview`]. A missing or
    /// unusable page becomes `1`, and a missing or unknown confidence becomes
    /// [`Confidence::Low`].
    ///
    /// # Errors
    ///
    /// Returns `ExtractionError::Malformed` if the response is empty, not JSON,
    /// or missing `value`, `quote` or `reasoning`.
    /// Returns `ExtractionError::ExhaustedRetries` if every attempt was rate limited.
    /// Returns `ExtractionError::Provider` for any other provider failure.
    pub async fn extract_with_metrics(
        &self,
        document: &Document,
        field: &ExtractionField,
        model: &ModelId,
    ) -> Result<(ExtractionResult, ExtractionMetrics), ExtractionError> {
        let start = Instant::now();
        let schema = validation_schema().map_err(|e| ExtractionError::Schema(e.to_string()))?;

        let request = ModelRequest::new(model.clone(), build_extraction_prompt(document, field))
            .with_system_instruction(EXTRACTION_SYSTEM_INSTRUCTION)
            .with_response_schema(provider_response_schema());

        tracing::debug!(
            document_id = %document.id,
            field_id = %field.id,
            field_type = %field.field_type,
            model = %model,
            "extracting field"
        );

        let (raw, attempts) = self.call(&request).await?;
        let wire = parse_response(&raw, &schema).inspect_err(|e| {
            tracing::warn!(
                document_id = %document.id,
                field_id = %field.id,
                error = %e,
                "discarding malformed extraction response"
            );
        })?;

        let result = ExtractionResult {
            field_id: field.id.clone(),
            document_id: document.id.clone(),
            value: wire.value,
            confidence: Confidence::parse_lenient(wire.confidence.as_ref().and_then(Value::as_str)),
            quote: wire.quote,
            page: Some(normalize_page(wire.page.as_ref())),
            reasoning: wire.reasoning,
            status: ReviewStatus::NeedsReview,
        };

        let metrics = ExtractionMetrics {
            attempts,
            wall_time: start.elapsed(),
            estimated_input_tokens: estimate_tokens_from_chars(request.input_chars()),
            estimated_output_tokens: estimate_tokens(&raw),
        };
        Ok((result, metrics))
    }

    /// Writes or refines the instruction for a field.
    ///
    /// Never fails: any provider error or empty answer yields
    /// `"Extract the {field_name} from the document."`.
    pub async fn generate_prompt_hint(
        &self,
        field_name: &str,
        field_type: FieldType,
        draft: Option<&str>,
    ) -> String {
        let request = ModelRequest::new(
            self.config.default_model.clone(),
            build_hint_prompt(field_name, field_type, draft),
        )
        .with_system_instruction(HINT_SYSTEM_INSTRUCTION);

        match self.call(&request).await {
            Ok((text, _)) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) => {
                tracing::warn!(field = field_name, "empty prompt hint, using fallback");
                fallback_hint(field_name)
            }
            Err(e) => {
                tracing::warn!(field = field_name, error = %e, "prompt hint failed, using fallback");
                fallback_hint(field_name)
            }
        }
    }

    /// Answers `question` strictly from the extraction table in `context`.
    ///
    /// `history` is replayed as prior turns. Never fails: any error or empty
    /// answer yields [`DATA_QUESTION_APOLOGY`].
    pub async fn answer_data_question(
        &self,
        question: &str,
        context: &DataContext,
        history: &[Turn],
        model: &ModelId,
    ) -> String {
        let request = ModelRequest::new(model.clone(), question)
            .with_system_instruction(build_data_question_instruction(&context.to_csv()))
            .with_history(history.to_vec());

        tracing::debug!(
            documents = context.documents.len(),
            fields = context.fields.len(),
            history_turns = history.len(),
            "answering data question"
        );

        match self.call(&request).await {
            Ok((text, _)) if !text.trim().is_empty() => text,
            Ok(_) => DATA_QUESTION_APOLOGY.to_string(),
            Err(e) => {
                tracing::warn!(error = %e, "data question failed");
                DATA_QUESTION_APOLOGY.to_string()
            }
        }
    }

    async fn call(&self, request: &ModelRequest) -> Result<(String, u32), ExtractionError> {
        RetryExecutor::new(self.config.retry)
            .execute_counted(|| self.client.generate(request))
            .await
            .map_err(ExtractionError::from)
    }
}

/// Parses and validates a raw provider answer.
fn parse_response(raw: &str, schema: &Value) -> Result<WireExtraction, ExtractionError> {
    let body = strip_code_fence(raw.trim());
    if body.is_empty() {
        return Err(ExtractionError::malformed("empty response", raw));
    }

    let parsed: Value = serde_json::from_str(body)
        .map_err(|e| ExtractionError::malformed(format!("response is not JSON: {e}"), raw))?;

    let errors = collect_validation_errors(schema, &parsed);
    if !errors.is_empty() {
        return Err(ExtractionError::Malformed {
            reason: format!("response failed validation with {} error(s)", errors.len()),
            errors,
            raw: raw.to_string(),
        });
    }

    serde_json::from_value(parsed)
        .map_err(|e| ExtractionError::malformed(format!("unexpected response shape: {e}"), raw))
}

/// Removes a surrounding Markdown code fence, if any.
fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Positive page number from an integer or numeric string, else `1`.
fn normalize_page(page: Option<&Value>) -> u32 {
    let parsed = match page {
        Some(Value::Number(n)) => n.as_u64().and_then(|p| u32::try_from(p).ok()),
        Some(Value::String(s)) => s.trim().parse::<u32>().ok(),
        _ => None,
    };
    parsed.filter(|p| *p > 0).unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> Value {
        validation_schema().unwrap()
    }

    #[test]
    fn page_normalization() {
        assert_eq!(normalize_page(None), 1);
        assert_eq!(normalize_page(Some(&json!(4))), 4);
        assert_eq!(normalize_page(Some(&json!(" 3 "))), 3);
        assert_eq!(normalize_page(Some(&json!(0))), 1);
        assert_eq!(normalize_page(Some(&json!(-2))), 1);
        assert_eq!(normalize_page(Some(&json!("iv"))), 1);
        assert_eq!(normalize_page(Some(&json!(null))), 1);
    }

    #[test]
    fn code_fences_are_stripped() {
        assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```\n{}\n```"), "{}");
        assert_eq!(strip_code_fence("{}"), "{}");
    }

    #[test]
    fn empty_and_non_json_responses_are_malformed() {
        assert!(matches!(
            parse_response("  ", &schema()),
            Err(ExtractionError::Malformed { .. })
        ));
        let err = parse_response("The answer is 42", &schema()).unwrap_err();
        match err {
            ExtractionError::Malformed { reason, raw, .. } => {
                assert!(reason.contains("not JSON"));
                assert_eq!(raw, "The answer is 42");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn schema_violations_carry_every_error() {
        let err = parse_response(r#"{"value": 5, "confidence": "High"}"#, &schema()).unwrap_err();
        let ExtractionError::Malformed { errors, .. } = err else {
            panic!("expected Malformed");
        };
        assert!(errors.len() >= 3);
        assert!(errors.iter().any(|e| e.contains("/value")));
        assert!(errors.iter().any(|e| e.contains("reasoning")));
    }

    #[test]
    fn unrecognized_confidence_is_not_malformed() {
        for confidence in [json!(3), json!(true), json!({"level": "high"}), json!("certain")] {
            let body = json!({
                "value": "1200",
                "confidence": confidence,
                "quote": "$1,200",
                "reasoning": "r"
            })
            .to_string();
            let wire = parse_response(&body, &schema()).unwrap();
            assert_eq!(
                Confidence::parse_lenient(wire.confidence.as_ref().and_then(Value::as_str)),
                Confidence::Low
            );
        }
    }
}
