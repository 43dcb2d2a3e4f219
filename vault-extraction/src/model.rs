//! Provider-agnostic model call surface.
//!
//! The extraction engine only needs "send these turns, get text back". Concrete
//! providers live in other crates and implement [`ModelClient`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::retry::{looks_rate_limited, RateLimitSignal};
use crate::types::ModelId;

/// Speaker of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    /// The human side.
    User,
    /// The model side.
    Model,
}

/// One turn of the request contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    /// Who said it.
    pub role: TurnRole,
    /// What was said.
    pub text: String,
}

impl Turn {
    /// A user turn.
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            text: text.into(),
        }
    }

    /// A model turn.
    #[must_use]
    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Model,
            text: text.into(),
        }
    }
}

/// A single generation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRequest {
    /// Target model.
    pub model: ModelId,
    /// Optional system instruction.
    pub system_instruction: Option<String>,
    /// Ordered conversation turns; the last one is the prompt.
    pub contents: Vec<Turn>,
    /// When set, the provider must answer with JSON matching this schema.
    pub response_schema: Option<serde_json::Value>,
}

impl ModelRequest {
    /// A request with a single user turn.
    #[must_use]
    pub fn new(model: ModelId, prompt: impl Into<String>) -> Self {
        Self {
            model,
            system_instruction: None,
            contents: vec![Turn::user(prompt)],
            response_schema: None,
        }
    }

    /// Sets the system instruction.
    #[must_use]
    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }

    /// Requests JSON output constrained by `schema`.
    #[must_use]
    pub fn with_response_schema(mut self, schema: serde_json::Value) -> Self {
        self.response_schema = Some(schema);
        self
    }

    /// Inserts prior turns before the prompt turn.
    #[must_use]
    pub fn with_history(mut self, history: Vec<Turn>) -> Self {
        let prompt = self.contents.pop();
        self.contents = history;
        self.contents.extend(prompt);
        self
    }

    /// Total characters sent, used for token estimates.
    #[must_use]
    pub fn input_chars(&self) -> usize {
        let system = self
            .system_instruction
            .as_deref()
            .map_or(0, |s| s.chars().count());
        system
            + self
                .contents
                .iter()
                .map(|t| t.text.chars().count())
                .sum::<usize>()
    }
}

/// Failure reported by a model provider.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ModelError {
    /// HTTP status, when the failure came from a response.
    pub status: Option<u16>,
    /// Provider error code (e.g. `"RESOURCE_EXHAUSTED"`).
    pub code: Option<String>,
    /// Human-readable message.
    pub message: String,
}

impl ModelError {
    /// An error with only a message (transport failures, bad config).
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: None,
            code: None,
            message: message.into(),
        }
    }

    /// An error carrying an HTTP status.
    #[must_use]
    pub fn with_status(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            code: None,
            message: message.into(),
        }
    }

    /// Attaches a provider error code.
    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

impl RateLimitSignal for ModelError {
    fn is_rate_limited(&self) -> bool {
        self.status == Some(429)
            || self.code.as_deref().is_some_and(looks_rate_limited)
            || looks_rate_limited(&self.message)
    }
}

/// Anything that can turn a [`ModelRequest`] into response text.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Sends the request and returns the raw response text.
    ///
    /// # Errors
    /// Returns [`ModelError`] when the provider call fails.
    async fn generate(&self, request: &ModelRequest) -> Result<String, ModelError>;
}

#[async_trait]
impl<T: ModelClient + ?Sized> ModelClient for std::sync::Arc<T> {
    async fn generate(&self, request: &ModelRequest) -> Result<String, ModelError> {
        (**self).generate(request).await
    }
}
