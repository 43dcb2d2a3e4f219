use crate::error::ChatError;
use crate::types::{ChatEndpointConfig, ChatRequest};
use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use std::time::Instant;

/// Body chunks of an open chat response, in arrival order.
pub type ByteStream = BoxStream<'static, Result<Vec<u8>, ChatError>>;

/// Opens a chat response stream for a request.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Sends `request` and returns the response body once headers arrive.
    ///
    /// # Errors
    /// Returns [`ChatError`] if the request cannot be sent or the endpoint
    /// answers with a non-success status.
    async fn open(&self, request: &ChatRequest) -> Result<ByteStream, ChatError>;
}

/// [`ChatTransport`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpChatTransport {
    http: reqwest::Client,
    config: ChatEndpointConfig,
}

impl HttpChatTransport {
    /// Creates a transport for the configured endpoint.
    ///
    /// # Errors
    /// Returns `ChatError::InvalidConfig` if the URL is empty, or
    /// `ChatError::Http` if the HTTP client cannot be built.
    pub fn new(config: ChatEndpointConfig) -> Result<Self, ChatError> {
        if config.url.trim().is_empty() {
            return Err(ChatError::InvalidConfig("chat URL is empty".to_string()));
        }
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ChatError::http("build client", e))?;
        Ok(Self { http, config })
    }
}

#[async_trait]
impl ChatTransport for HttpChatTransport {
    async fn open(&self, request: &ChatRequest) -> Result<ByteStream, ChatError> {
        let start_time = Instant::now();
        let mut builder = self
            .http
            .post(&self.config.url)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .json(request);
        if let Some(token) = &self.config.bearer_token {
            builder = builder.bearer_auth(token);
        }

        let timeout = self.config.timeout;
        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                ChatError::Timeout(timeout)
            } else {
                ChatError::http("send request", e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChatError::Status {
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!(
            status = status.as_u16(),
            elapsed_ms = u64::try_from(start_time.elapsed().as_millis()).unwrap_or(u64::MAX),
            "chat stream opened"
        );

        Ok(response
            .bytes_stream()
            .map(move |chunk| {
                chunk.map(|bytes| bytes.to_vec()).map_err(|e| {
                    if e.is_timeout() {
                        ChatError::Timeout(timeout)
                    } else {
                        ChatError::Read(e.to_string())
                    }
                })
            })
            .boxed())
    }
}
