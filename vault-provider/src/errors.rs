use thiserror::Error;

/// Errors surfaced by the integration layer.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Error from the Gemini adapter.
    #[error("Gemini adapter error: {0}")]
    Gemini(#[from] gemini_adapter::GeminiError),

    /// Error from the chat stream adapter.
    #[error("Chat adapter error: {0}")]
    Chat(#[from] chat_adapter::ChatError),

    /// Extraction of a (document, field) pair failed.
    #[error("Extraction error: {0}")]
    Extraction(#[from] vault_extraction::extraction::ExtractionError),

    /// A document could not be loaded.
    #[error("Document store error: {0}")]
    Store(#[from] vault_extraction::store::StoreError),

    /// Chat session misuse or driver failure.
    #[error("Session error: {0}")]
    Session(#[from] crate::sessions::SessionError),

    /// Invalid configuration value.
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Anyhow error.
    #[error("Anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}
