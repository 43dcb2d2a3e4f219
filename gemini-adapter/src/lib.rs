//! Rust adapter for the Gemini `generateContent` REST API.
//!
//! This crate provides API key discovery, the request/response wire types,
//! and a small client that returns either the full response or just its text.

/// HTTP execution of `generateContent` calls.
pub mod client;
/// Discovery of the API key and base URL from the environment.
pub mod discovery;
/// Error types returned by adapter operations.
pub mod error;
/// Endpoint URL construction.
pub mod request;
/// Configuration and wire types.
pub mod types;

pub use client::generate_content;
pub use discovery::{discover_api_key, GEMINI_API_KEY_ENV_VAR, GOOGLE_API_KEY_ENV_VAR};
pub use error::GeminiError;
pub use types::*;

/// High-level client for the Gemini API.
#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    config: types::GeminiConfig,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("base_url", &self.config.base_url)
            .field("timeout", &self.config.timeout)
            .finish_non_exhaustive()
    }
}

impl GeminiClient {
    /// Creates a client, resolving the API key from `config` or the environment.
    ///
    /// # Errors
    ///
    /// Returns `GeminiError::MissingApiKey` if no key can be found, or
    /// `GeminiError::Http` if the HTTP client cannot be built.
    pub fn new(config: types::GeminiConfig) -> Result<Self, GeminiError> {
        let api_key = discover_api_key(config.api_key.as_deref())?;
        let http = reqwest::Client::builder().build()?;
        Ok(Self {
            http,
            api_key,
            config,
        })
    }

    /// The configuration in use.
    #[must_use]
    pub const fn config(&self) -> &types::GeminiConfig {
        &self.config
    }

    /// Sends a request and returns the full response.
    ///
    /// # Errors
    ///
    /// Returns `GeminiError` if the request fails, times out, returns a non-2xx
    /// status, or the body is not a valid response.
    pub async fn generate(
        &self,
        model: &str,
        request: &types::GenerateContentRequest,
    ) -> Result<types::GenerateContentResponse, GeminiError> {
        generate_content(
            &self.http,
            &self.config.base_url,
            &self.api_key,
            model,
            request,
            self.config.timeout,
        )
        .await
    }

    /// Sends a request and returns the first candidate's text.
    ///
    /// # Errors
    ///
    /// Same as [`generate`](Self::generate), plus `GeminiError::EmptyResponse`
    /// when the response carries no text.
    pub async fn generate_text(
        &self,
        model: &str,
        request: &types::GenerateContentRequest,
    ) -> Result<String, GeminiError> {
        let response = self.generate(model, request).await?;
        response.text().ok_or_else(|| GeminiError::EmptyResponse {
            reason: response.empty_reason(),
        })
    }
}
