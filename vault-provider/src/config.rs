//! Configuration shared by the extraction engine and chat sessions.

use std::time::Duration;

use chat_adapter::ChatEndpointConfig;
use gemini_adapter::GeminiConfig;
use vault_extraction::extraction::ExtractionConfig;
use vault_extraction::types::ModelId;

use crate::errors::ProviderError;
use crate::sessions::DEFAULT_CHANNEL_CAPACITY;

/// Chat endpoint URL.
pub const CHAT_URL_ENV_VAR: &str = "VAULT_CHAT_URL";
/// Opaque bearer token for the chat endpoint.
pub const BEARER_TOKEN_ENV_VAR: &str = "VAULT_BEARER_TOKEN";
/// Default model for extraction and hints.
pub const MODEL_ENV_VAR: &str = "VAULT_MODEL";
/// Retry attempts after the first call.
pub const RETRY_MAX_ATTEMPTS_ENV_VAR: &str = "VAULT_RETRY_MAX_ATTEMPTS";
/// First backoff delay in milliseconds.
pub const RETRY_INITIAL_DELAY_ENV_VAR: &str = "VAULT_RETRY_INITIAL_DELAY_MS";

/// Everything needed to build the model client, the engine and sessions.
///
/// Values not found in the environment keep their defaults; the Gemini API
/// key is discovered by the adapter itself.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Gemini client settings.
    pub gemini: GeminiConfig,
    /// Chat stream endpoint settings.
    pub chat: ChatEndpointConfig,
    /// Retry policy and default model for extraction.
    pub extraction: ExtractionConfig,
    /// Bounded channel size for chat snapshots.
    ///
    /// Default: 100 snapshots.
    pub channel_capacity: usize,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            gemini: GeminiConfig::default(),
            chat: ChatEndpointConfig::default(),
            extraction: ExtractionConfig::default(),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl ProviderConfig {
    /// Reads overrides from the process environment.
    ///
    /// # Errors
    /// Returns `ProviderError::Config` when a numeric variable does not parse.
    pub fn from_env() -> Result<Self, ProviderError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads overrides through `lookup`; empty values count as unset.
    ///
    /// # Errors
    /// Returns `ProviderError::Config` when a numeric variable does not parse.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ProviderError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(url) = get(CHAT_URL_ENV_VAR) {
            config.chat.url = url.trim().to_string();
        }
        if let Some(token) = get(BEARER_TOKEN_ENV_VAR) {
            config.chat.bearer_token = Some(token.trim().to_string());
        }
        if let Some(model) = get(MODEL_ENV_VAR) {
            config.extraction.default_model = ModelId::new(model.trim());
        }

        if let Some(raw) = get(RETRY_MAX_ATTEMPTS_ENV_VAR) {
            config.extraction.retry.max_attempts = parse_number(RETRY_MAX_ATTEMPTS_ENV_VAR, &raw)?;
        }
        if let Some(raw) = get(RETRY_INITIAL_DELAY_ENV_VAR) {
            let delay_ms: u64 = parse_number(RETRY_INITIAL_DELAY_ENV_VAR, &raw)?;
            if delay_ms == 0 {
                return Err(ProviderError::Config(format!(
                    "{RETRY_INITIAL_DELAY_ENV_VAR} must be greater than zero"
                )));
            }
            config.extraction.retry.initial_delay = Duration::from_millis(delay_ms);
        }

        Ok(config)
    }

    /// Set the chat snapshot buffer size.
    #[must_use]
    pub const fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, ProviderError>
where
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| ProviderError::Config(format!("{key}={raw:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use vault_extraction::retry::RetryPolicy;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_environment() {
        let config = ProviderConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.channel_capacity, 100);
        assert!(config.chat.url.is_empty());
        assert_eq!(config.extraction.retry, RetryPolicy::default());
        assert_eq!(config.extraction.default_model, ModelId::default());
    }

    #[test]
    fn reads_overrides() {
        let config = ProviderConfig::from_lookup(lookup(&[
            (CHAT_URL_ENV_VAR, "http://localhost:3000/api/chat"),
            (BEARER_TOKEN_ENV_VAR, " tok "),
            (MODEL_ENV_VAR, "gemini-1.5-pro"),
            (RETRY_MAX_ATTEMPTS_ENV_VAR, "2"),
            (RETRY_INITIAL_DELAY_ENV_VAR, "250"),
        ]))
        .unwrap();

        assert_eq!(config.chat.url, "http://localhost:3000/api/chat");
        assert_eq!(config.chat.bearer_token.as_deref(), Some("tok"));
        assert_eq!(config.extraction.default_model.as_str(), "gemini-1.5-pro");
        assert_eq!(config.extraction.retry, RetryPolicy::new(2, 250));
    }

    #[test]
    fn empty_values_count_as_unset() {
        let config =
            ProviderConfig::from_lookup(lookup(&[(BEARER_TOKEN_ENV_VAR, "  ")])).unwrap();
        assert!(config.chat.bearer_token.is_none());
    }

    #[test]
    fn bad_numbers_are_config_errors() {
        let err = ProviderConfig::from_lookup(lookup(&[(RETRY_MAX_ATTEMPTS_ENV_VAR, "many")]))
            .unwrap_err();
        assert!(matches!(err, ProviderError::Config(msg) if msg.contains(RETRY_MAX_ATTEMPTS_ENV_VAR)));

        let err = ProviderConfig::from_lookup(lookup(&[(RETRY_INITIAL_DELAY_ENV_VAR, "0")]))
            .unwrap_err();
        assert!(matches!(err, ProviderError::Config(_)));
    }
}
