#![deny(missing_docs)]
//! The Vault Provider crate is the integration point of the AI pipeline.
//!
//! It plugs the Gemini adapter into the extraction engine as a
//! [`ModelClient`](vault_extraction::model::ModelClient), runs streaming chat
//! exchanges over the chat adapter, and ships the `vault-ai` binary.

/// Model client implementations.
pub mod adapters;
/// Environment-driven configuration.
pub mod config;
/// Error types for the provider.
pub mod errors;
/// Chat messages and their parts.
pub mod message;
/// Streaming chat sessions and conversation history.
pub mod sessions;
/// Filesystem document store.
pub mod store;
/// Utility functions.
pub mod utils;

use std::sync::Arc;

use chat_adapter::{ChatTransport, HttpChatTransport};
use vault_extraction::extraction::ExtractionEngine;

pub use adapters::gemini::GeminiModel;
pub use config::ProviderConfig;
pub use errors::ProviderError;
pub use message::{ChatMessage, ChatRole, MessagePart, ReasoningPart, ToolInvocation};
pub use sessions::{
    CancelHandle, ChatContext, ChatExchange, ChatSnapshot, Conversation, SessionError,
    SessionState, StreamingChatSession,
};
pub use store::FsDocumentStore;

/// Builds engines and chat sessions from one [`ProviderConfig`].
#[derive(Debug, Clone)]
pub struct VaultProvider {
    config: ProviderConfig,
}

impl VaultProvider {
    /// Wraps a configuration.
    #[must_use]
    pub const fn new(config: ProviderConfig) -> Self {
        Self { config }
    }

    /// The configuration in use.
    #[must_use]
    pub const fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// An extraction engine backed by Gemini.
    ///
    /// # Errors
    /// Returns `ProviderError::Gemini` if no API key is available.
    pub fn engine(&self) -> Result<ExtractionEngine<GeminiModel>, ProviderError> {
        let model = GeminiModel::new(self.config.gemini.clone())?;
        Ok(ExtractionEngine::with_config(
            model,
            self.config.extraction.clone(),
        ))
    }

    /// The HTTP transport for chat sessions.
    ///
    /// # Errors
    /// Returns `ProviderError::Chat` if the chat URL is not configured.
    pub fn chat_transport(&self) -> Result<Arc<HttpChatTransport>, ProviderError> {
        Ok(Arc::new(HttpChatTransport::new(self.config.chat.clone())?))
    }

    /// A fresh session over `transport` with the configured buffer size.
    #[must_use]
    pub fn session<T: ChatTransport + 'static>(&self, transport: Arc<T>) -> StreamingChatSession<T> {
        StreamingChatSession::new(transport).with_channel_capacity(self.config.channel_capacity)
    }
}
