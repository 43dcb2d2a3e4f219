use crate::error::GeminiError;
use crate::request::{generate_content_url, API_KEY_HEADER};
use crate::types::{GenerateContentRequest, GenerateContentResponse};
use std::time::{Duration, Instant};

pub async fn generate_content(
    http: &reqwest::Client,
    base_url: &str,
    api_key: &str,
    model: &str,
    request: &GenerateContentRequest,
    timeout: Duration,
) -> Result<GenerateContentResponse, GeminiError> {
    let url = generate_content_url(base_url, model);
    let start_time = Instant::now();

    tracing::debug!(model, turns = request.contents.len(), "sending generateContent request");

    let response = http
        .post(&url)
        .header(API_KEY_HEADER, api_key)
        .timeout(timeout)
        .json(request)
        .send()
        .await
        .map_err(|e| classify(e, timeout))?;

    let status = response.status();
    let body = response.text().await.map_err(|e| classify(e, timeout))?;
    let duration_ms = u64::try_from(start_time.elapsed().as_millis()).unwrap_or(u64::MAX);

    if !status.is_success() {
        tracing::debug!(model, status = status.as_u16(), duration_ms, "generateContent failed");
        return Err(GeminiError::from_response(status.as_u16(), &body));
    }

    tracing::debug!(model, duration_ms, bytes = body.len(), "generateContent succeeded");
    serde_json::from_str(&body).map_err(|e| GeminiError::JsonParseError(e.to_string()))
}

fn classify(err: reqwest::Error, timeout: Duration) -> GeminiError {
    if err.is_timeout() {
        GeminiError::Timeout(timeout)
    } else {
        GeminiError::Http(err)
    }
}
