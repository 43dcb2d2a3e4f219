use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Where and how to open chat streams.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatEndpointConfig {
    /// Full URL of the chat endpoint.
    pub url: String,
    /// Opaque bearer token sent as `Authorization: Bearer <token>`.
    pub bearer_token: Option<String>,
    /// Maximum lifetime of one stream, connection included.
    pub timeout: Duration,
}

impl Default for ChatEndpointConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            bearer_token: None,
            timeout: Duration::from_secs(300),
        }
    }
}

impl ChatEndpointConfig {
    /// Config for `url` with default settings.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Set the bearer token.
    #[must_use]
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    /// Set the stream timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Body of a chat request.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    /// The user's message.
    pub message: String,
    /// Project the conversation belongs to.
    pub project_id: String,
    /// Folder scoping the documents in play.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_folder_id: Option<String>,
    /// Documents attached to the message.
    #[serde(default)]
    pub file_ids: Vec<String>,
    /// Existing conversation to continue.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
}

/// Lifecycle of a tool invocation, in the order it may move through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ToolCallState {
    /// Arguments are still streaming in.
    PartialCall,
    /// Arguments are complete; the tool is running.
    Call,
    /// The tool returned.
    Result,
}

/// One decoded unit of a chat response stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum StreamFrame {
    /// A chunk of assistant text.
    Content {
        /// The text content.
        text: String,
    },
    /// A tool invocation update.
    #[serde(rename_all = "camelCase")]
    ToolCall {
        /// Stable identity of the invocation, when the server sends one.
        #[serde(default)]
        tool_call_id: Option<String>,
        /// Name of the tool.
        tool_name: String,
        /// Arguments so far.
        #[serde(default)]
        args: serde_json::Value,
        /// Where the invocation is in its lifecycle.
        state: ToolCallState,
        /// Tool output, once `state` is `result`.
        #[serde(default)]
        result: Option<serde_json::Value>,
    },
    /// A reasoning step.
    Reasoning {
        /// Raw reasoning text.
        text: String,
        /// Step title, when sent as a field.
        #[serde(default)]
        title: Option<String>,
        /// Planned action, when sent as a field.
        #[serde(default)]
        action: Option<String>,
        /// Stated confidence, when sent as a field.
        #[serde(default)]
        confidence: Option<String>,
    },
    /// The response is complete.
    Done,
    /// The server gave up on this response.
    Error {
        /// Error message.
        message: String,
    },
}
