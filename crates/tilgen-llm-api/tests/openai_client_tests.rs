mod fixtures;

use fixtures::LLMMockServer;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;

use tilgen_llm_api::{ChatSettings, LlmClient, LlmError, OpenAiClient};
use tilgen_logging::RequestLogger;
use tilgen_types::{Message, Role};

fn client_for(server: &LLMMockServer, key: Option<&str>) -> OpenAiClient {
    OpenAiClient::new(
        key.map(str::to_string),
        server.completions_url(),
        ChatSettings::default(),
    )
    .unwrap()
}

#[tokio::test]
async fn test_successful_completion() {
    let server = LLMMockServer::new().await;
    server.mock_success("## 날짜: 2025-03-01").await;

    let client = client_for(&server, Some("test-api-key"));
    let response = client
        .chat_completion(&[Message::system("be brief"), Message::human("I learned axum")])
        .await
        .unwrap();

    assert_eq!(response.message.role, Role::Assistant);
    assert_eq!(response.message.content, "## 날짜: 2025-03-01");
    assert_eq!(response.usage.map(|u| u.total_tokens), Some(30));

    let bodies = server.received_bodies().await;
    assert_eq!(bodies.len(), 1);
    assert_eq!(bodies[0]["messages"][0]["role"], "system");
    assert_eq!(bodies[0]["messages"][1]["role"], "user");
    assert_eq!(bodies[0]["messages"][1]["content"], "I learned axum");
}

#[tokio::test]
async fn test_missing_key_fails_without_request() {
    let server = LLMMockServer::new().await;

    let client = client_for(&server, Some("   "));
    assert!(!client.has_credentials());

    let err = client.chat_completion(&[Message::human("hi")]).await.unwrap_err();
    assert!(matches!(err, LlmError::MissingApiKey));
    assert!(server.received_bodies().await.is_empty());
}

#[tokio::test]
async fn test_unauthorized() {
    let server = LLMMockServer::new().await;
    server.mock_error(401, "Incorrect API key provided").await;

    let client = client_for(&server, Some("bad-key"));
    let err = client.chat_completion(&[Message::human("hi")]).await.unwrap_err();
    assert!(matches!(err, LlmError::Unauthorized { status: 401 }));
}

#[tokio::test]
async fn test_rate_limited_carries_retry_after() {
    let server = LLMMockServer::new().await;
    server.mock_rate_limit().await;

    let client = client_for(&server, Some("test-api-key"));
    let err = client.chat_completion(&[Message::human("hi")]).await.unwrap_err();
    assert!(matches!(err, LlmError::RateLimited { retry_after: Some(60) }));
}

#[tokio::test]
async fn test_server_error() {
    let server = LLMMockServer::new().await;
    server.mock_error(500, "boom").await;

    let client = client_for(&server, Some("test-api-key"));
    match client.chat_completion(&[Message::human("hi")]).await {
        Err(LlmError::Api { status, body }) => {
            assert_eq!(status, 500);
            assert!(body.contains("boom"));
        }
        other => panic!("expected Api error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_malformed_body() {
    let server = LLMMockServer::new().await;
    server.mock_raw_body("not json at all").await;

    let client = client_for(&server, Some("test-api-key"));
    let err = client.chat_completion(&[Message::human("hi")]).await.unwrap_err();
    assert!(matches!(err, LlmError::MalformedResponse(_)));
}

#[tokio::test]
async fn test_empty_choices_is_malformed() {
    let server = LLMMockServer::new().await;
    server.mock_raw_body(r#"{"choices": []}"#).await;

    let client = client_for(&server, Some("test-api-key"));
    let err = client.chat_completion(&[Message::human("hi")]).await.unwrap_err();
    assert!(matches!(err, LlmError::MalformedResponse(_)));
}

#[tokio::test]
async fn test_empty_content_is_success() {
    let server = LLMMockServer::new().await;
    server
        .mock_raw_body(r#"{"choices": [{"message": {"role": "assistant", "content": null}}]}"#)
        .await;

    let client = client_for(&server, Some("test-api-key"));
    let response = client.chat_completion(&[Message::human("hi")]).await.unwrap();
    assert_eq!(response.message.content, "");
    assert!(response.usage.is_none());
}

#[tokio::test]
async fn test_timeout() {
    let server = LLMMockServer::new().await;
    server.mock_slow(Duration::from_secs(2)).await;

    let settings = ChatSettings {
        timeout: Duration::from_millis(200),
        ..ChatSettings::default()
    };
    let client = OpenAiClient::new(
        Some("test-api-key".to_string()),
        server.completions_url(),
        settings,
    )
    .unwrap();

    let err = client.chat_completion(&[Message::human("hi")]).await.unwrap_err();
    assert!(matches!(err, LlmError::Timeout(d) if d == Duration::from_millis(200)));
}

#[tokio::test]
async fn test_request_logger_writes_pair() {
    let server = LLMMockServer::new().await;
    server.mock_success("done").await;

    let tmp = tempfile::TempDir::new().unwrap();
    let logger = Arc::new(RequestLogger::new(tmp.path()).unwrap());
    let client = client_for(&server, Some("test-api-key")).with_request_logger(logger);

    client.chat_completion(&[Message::human("hi")]).await.unwrap();

    let mut names: Vec<String> = std::fs::read_dir(tmp.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    assert_eq!(names.len(), 2);
    assert!(names[0].starts_with("req-"));
    assert!(names[1].starts_with("resp-"));
}
