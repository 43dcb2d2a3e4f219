use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GeminiError {
    #[error("No Gemini API key: pass one explicitly or set GEMINI_API_KEY or GOOGLE_API_KEY")]
    MissingApiKey,

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Gemini API returned {status}: {message}")]
    Status {
        status: u16,
        code: Option<String>,
        message: String,
    },

    #[error("Response contained no text{}", parenthesized(.reason.as_deref()))]
    EmptyResponse { reason: Option<String> },

    #[error("Failed to parse JSON: {0}")]
    JsonParseError(String),
}

fn parenthesized(reason: Option<&str>) -> String {
    reason.map(|r| format!(" ({r})")).unwrap_or_default()
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

impl GeminiError {
    /// Builds a [`GeminiError::Status`] from a non-2xx response.
    ///
    /// Bodies shaped like `{"error":{"code":..,"message":..,"status":..}}` are
    /// unpacked; anything else is kept verbatim as the message.
    #[must_use]
    pub fn from_response(status: u16, body: &str) -> Self {
        match serde_json::from_str::<ErrorEnvelope>(body) {
            Ok(envelope) => Self::Status {
                status,
                code: envelope.error.status,
                message: envelope.error.message,
            },
            Err(_) => Self::Status {
                status,
                code: None,
                message: body.trim().to_string(),
            },
        }
    }

    /// HTTP status of the failed response, if there was one.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Provider status code such as `RESOURCE_EXHAUSTED`, if reported.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Status { code, .. } => code.as_deref(),
            _ => None,
        }
    }
}
