use async_trait::async_trait;
use gemini_adapter::{Content, GeminiClient, GeminiConfig, GeminiError, GenerateContentRequest, Role};
use vault_extraction::model::{ModelClient, ModelError, ModelRequest, Turn, TurnRole};

/// The [`ModelClient`] implementation for Gemini.
#[derive(Debug, Clone)]
pub struct GeminiModel {
    /// The underlying HTTP client.
    pub client: GeminiClient,
}

impl GeminiModel {
    /// Creates a model client from adapter configuration.
    ///
    /// # Errors
    /// Returns a `GeminiError` if no API key is available or the HTTP client
    /// cannot be built.
    pub fn new(config: GeminiConfig) -> Result<Self, GeminiError> {
        Ok(Self {
            client: GeminiClient::new(config)?,
        })
    }
}

#[async_trait]
impl ModelClient for GeminiModel {
    async fn generate(&self, request: &ModelRequest) -> Result<String, ModelError> {
        let wire = to_gemini_request(request);
        match self.client.generate_text(request.model.as_str(), &wire).await {
            Ok(text) => Ok(text),
            // An answer with no text is an empty body, not a failed call.
            Err(GeminiError::EmptyResponse { reason }) => {
                tracing::debug!(model = %request.model, ?reason, "response contained no text");
                Ok(String::new())
            }
            Err(e) => Err(to_model_error(e)),
        }
    }
}

/// Maps a provider-agnostic request onto the `generateContent` body.
#[must_use]
pub fn to_gemini_request(request: &ModelRequest) -> GenerateContentRequest {
    let contents = request.contents.iter().map(to_content).collect();
    let mut wire = GenerateContentRequest::new(contents);
    if let Some(instruction) = &request.system_instruction {
        wire = wire.with_system_instruction(instruction.clone());
    }
    if let Some(schema) = &request.response_schema {
        wire = wire.with_response_schema(schema.clone());
    }
    wire
}

fn to_content(turn: &Turn) -> Content {
    let role = match turn.role {
        TurnRole::User => Role::User,
        TurnRole::Model => Role::Model,
    };
    Content::text(role, turn.text.clone())
}

/// Keeps the HTTP status and provider code so rate limits stay recognizable.
#[must_use]
pub fn to_model_error(error: GeminiError) -> ModelError {
    match error {
        GeminiError::Status {
            status,
            code,
            message,
        } => {
            let err = ModelError::with_status(status, message);
            match code {
                Some(code) => err.with_code(code),
                None => err,
            }
        }
        other => ModelError::new(other.to_string()),
    }
}
