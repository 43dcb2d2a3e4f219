//! Client tests against a one-shot local HTTP server.

use gemini_adapter::{Content, GeminiClient, GeminiConfig, GeminiError, GenerateContentRequest, Role};
use serde_json::json;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Accepts one connection, answers with `status` and `body`, and returns the raw request.
async fn serve_once(status: &'static str, body: String) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut raw = Vec::new();
        let mut buf = [0u8; 4096];
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
        String::from_utf8_lossy(&raw).into_owned()
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

fn client(base_url: &str) -> GeminiClient {
    GeminiClient::new(
        GeminiConfig::default()
            .with_api_key("test-key")
            .with_base_url(base_url)
            .with_timeout(Duration::from_secs(5)),
    )
    .unwrap()
}

fn request() -> GenerateContentRequest {
    GenerateContentRequest::new(vec![Content::text(Role::User, "What is the rent?")])
        .with_system_instruction("Answer from the document.")
}

#[tokio::test]
async fn sends_key_and_returns_text() {
    let body = json!({
        "candidates": [{"content": {"role": "model", "parts": [{"text": "1200"}]}, "finishReason": "STOP"}]
    })
    .to_string();
    let (base_url, server) = serve_once("200 OK", body).await;

    let text = client(&base_url)
        .generate_text("gemini-2.0-flash", &request())
        .await
        .unwrap();
    assert_eq!(text, "1200");

    let raw = server.await.unwrap();
    assert!(raw.starts_with("POST /v1beta/models/gemini-2.0-flash:generateContent HTTP/1.1"));
    assert!(raw.to_ascii_lowercase().contains("x-goog-api-key: test-key"));
    assert!(raw.contains("\"systemInstruction\""));
    assert!(raw.contains("What is the rent?"));
}

#[tokio::test]
async fn rate_limit_status_is_surfaced() {
    let body = json!({
        "error": {"code": 429, "message": "Quota exceeded", "status": "RESOURCE_EXHAUSTED"}
    })
    .to_string();
    let (base_url, server) = serve_once("429 Too Many Requests", body).await;

    let err = client(&base_url)
        .generate_text("gemini-2.0-flash", &request())
        .await
        .unwrap_err();
    server.await.unwrap();

    assert_eq!(err.status(), Some(429));
    assert_eq!(err.code(), Some("RESOURCE_EXHAUSTED"));
}

#[tokio::test]
async fn blocked_prompt_is_an_empty_response() {
    let body = json!({"promptFeedback": {"blockReason": "SAFETY"}}).to_string();
    let (base_url, server) = serve_once("200 OK", body).await;

    let err = client(&base_url)
        .generate_text("gemini-2.0-flash", &request())
        .await
        .unwrap_err();
    server.await.unwrap();

    assert!(matches!(err, GeminiError::EmptyResponse { reason: Some(r) } if r == "SAFETY"));
}

#[tokio::test]
async fn missing_key_fails_before_any_request() {
    let config = GeminiConfig {
        api_key: Some("   ".into()),
        ..GeminiConfig::default()
    };
    // Only meaningful when the test environment has no key configured.
    if std::env::var("GEMINI_API_KEY").is_err() && std::env::var("GOOGLE_API_KEY").is_err() {
        assert!(matches!(GeminiClient::new(config), Err(GeminiError::MissingApiKey)));
    }
}

#[tokio::test]
#[ignore = "Requires GEMINI_API_KEY and network access"]
async fn e2e_generate_json() {
    let client = GeminiClient::new(GeminiConfig::default()).unwrap();
    let request = GenerateContentRequest::new(vec![Content::text(
        Role::User,
        "Return {\"answer\": \"yes\"} and nothing else.",
    )])
    .with_response_schema(json!({
        "type": "OBJECT",
        "properties": {"answer": {"type": "STRING"}},
        "required": ["answer"]
    }));

    let text = client.generate_text("gemini-2.0-flash", &request).await.unwrap();
    let value: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert!(value["answer"].is_string());
}
