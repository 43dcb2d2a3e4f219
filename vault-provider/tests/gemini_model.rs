//! Extraction through the Gemini model client against a local HTTP server.

use std::time::Duration;

use gemini_adapter::GeminiConfig;
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use vault_extraction::extraction::{ExtractionConfig, ExtractionEngine, ExtractionError};
use vault_extraction::retry::RetryPolicy;
use vault_extraction::types::{Confidence, Document, ExtractionField, FieldType, ModelId, ReviewStatus};
use vault_provider::GeminiModel;

/// Answers each accepted connection with the next `(status, body)` pair.
async fn serve(responses: Vec<(&'static str, String)>) -> (String, JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());

    let handle = tokio::spawn(async move {
        let mut requests = Vec::new();
        for (status, body) in responses {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut raw = Vec::new();
            let mut buf = [0u8; 8192];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                raw.extend_from_slice(&buf[..n]);
                if n == 0 || request_complete(&raw) {
                    break;
                }
            }
            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            requests.push(String::from_utf8_lossy(&raw).into_owned());
        }
        requests
    });

    (base_url, handle)
}

fn request_complete(raw: &[u8]) -> bool {
    let text = String::from_utf8_lossy(raw);
    let Some(header_end) = text.find("\r\n\r\n") else {
        return false;
    };
    let content_length = text[..header_end]
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.eq_ignore_ascii_case("content-length")
                .then(|| value.trim().parse::<usize>().ok())
                .flatten()
        })
        .unwrap_or(0);
    raw.len() >= header_end + 4 + content_length
}

fn candidate(text: &str) -> String {
    json!({
        "candidates": [{"content": {"role": "model", "parts": [{"text": text}]}, "finishReason": "STOP"}]
    })
    .to_string()
}

fn engine(base_url: &str) -> ExtractionEngine<GeminiModel> {
    let model = GeminiModel::new(
        GeminiConfig::default()
            .with_api_key("test-key")
            .with_base_url(base_url)
            .with_timeout(Duration::from_secs(5)),
    )
    .unwrap();
    ExtractionEngine::with_config(
        model,
        ExtractionConfig::default().with_retry(RetryPolicy::new(2, 1)),
    )
}

fn lease() -> Document {
    Document::new("lease-1", "Monthly rent: $1,200 payable on the first.")
}

fn rent_field() -> ExtractionField {
    ExtractionField::new("rent", "Rent", FieldType::Number, "Monthly rent amount")
}

#[tokio::test]
async fn extracts_and_normalizes_through_gemini() {
    let answer = json!({
        "value": "1200",
        "confidence": "High",
        "quote": "Monthly rent: $1,200",
        "reasoning": "Stated in the first line."
    })
    .to_string();
    let (base_url, server) = serve(vec![("200 OK", candidate(&answer))]).await;

    let result = engine(&base_url)
        .extract(&lease(), &rent_field(), &ModelId::new("gemini-2.0-flash"))
        .await
        .unwrap();

    assert_eq!(result.value, "1200");
    assert_eq!(result.confidence, Confidence::High);
    assert_eq!(result.page, Some(1));
    assert_eq!(result.status, ReviewStatus::NeedsReview);
    assert!(result.locate_quote(&lease().text).is_some());

    let requests = server.await.unwrap();
    assert!(requests[0].contains("\"responseSchema\""));
    assert!(requests[0].contains("Monthly rent: $1,200 payable"));
}

#[tokio::test]
async fn quota_errors_are_retried() {
    let quota = json!({
        "error": {"code": 429, "message": "Quota exceeded", "status": "RESOURCE_EXHAUSTED"}
    })
    .to_string();
    let answer = json!({
        "value": "1200",
        "quote": "Monthly rent: $1,200",
        "reasoning": "First line."
    })
    .to_string();
    let (base_url, server) = serve(vec![
        ("429 Too Many Requests", quota),
        ("200 OK", candidate(&answer)),
    ])
    .await;

    let result = engine(&base_url)
        .extract(&lease(), &rent_field(), &ModelId::default())
        .await
        .unwrap();

    assert_eq!(result.confidence, Confidence::Low);
    assert_eq!(server.await.unwrap().len(), 2);
}

#[tokio::test]
async fn empty_answer_is_malformed() {
    let (base_url, server) = serve(vec![("200 OK", candidate(""))]).await;

    let err = engine(&base_url)
        .extract(&lease(), &rent_field(), &ModelId::default())
        .await
        .unwrap_err();

    assert!(matches!(err, ExtractionError::Malformed { .. }), "{err:?}");
    assert_eq!(err.cell_placeholder(), "#MALFORMED");
    assert_eq!(server.await.unwrap().len(), 1);
}

#[tokio::test]
async fn answer_without_candidates_is_malformed() {
    let body = json!({"candidates": [], "promptFeedback": {"blockReason": "SAFETY"}}).to_string();
    let (base_url, server) = serve(vec![("200 OK", body)]).await;

    let err = engine(&base_url)
        .extract(&lease(), &rent_field(), &ModelId::default())
        .await
        .unwrap_err();

    assert!(matches!(err, ExtractionError::Malformed { .. }), "{err:?}");
    assert_eq!(server.await.unwrap().len(), 1);
}

#[tokio::test]
async fn bad_request_is_not_retried() {
    let body = json!({
        "error": {"code": 400, "message": "Invalid schema", "status": "INVALID_ARGUMENT"}
    })
    .to_string();
    let (base_url, server) = serve(vec![("400 Bad Request", body)]).await;

    let err = engine(&base_url)
        .extract(&lease(), &rent_field(), &ModelId::default())
        .await
        .unwrap_err();

    assert!(matches!(err, ExtractionError::Provider(ref e) if e.status == Some(400)));
    assert_eq!(server.await.unwrap().len(), 1);
}
