use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Chat endpoint is not configured: {0}")]
    InvalidConfig(String),

    #[error("HTTP request failed at stage '{stage}': {source}")]
    Http {
        stage: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Chat endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Stream timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Stream read failed: {0}")]
    Read(String),
}

impl ChatError {
    pub(crate) fn http(stage: &str, source: reqwest::Error) -> Self {
        Self::Http {
            stage: stage.to_string(),
            source,
        }
    }
}
