//! Retry and failure behaviour of the Freshdesk HTTP client against a mock server

use freshdesk_mcp::{Config, FreshdeskClient, FreshdeskError};
use secrecy::SecretString;
use serde_json::json;
use std::time::{Duration, Instant};

fn config(base_url: String, backoff_ms: u64) -> Config {
    Config {
        api_key: SecretString::new("test-key".to_string()),
        domain: "acme.freshdesk.com".to_string(),
        base_url: Some(base_url),
        retry_backoff_ms: backoff_ms,
        ..Config::default()
    }
}

#[tokio::test]
async fn test_transient_503_then_success() {
    let mut server = mockito::Server::new_async().await;
    let unavailable = server
        .mock("GET", "/tickets/1")
        .with_status(503)
        .expect(1)
        .create_async()
        .await;
    let ok = server
        .mock("GET", "/tickets/1")
        .with_status(200)
        .with_body(r#"{"id": 1, "subject": "Printer"}"#)
        .expect(1)
        .create_async()
        .await;

    let client = FreshdeskClient::new(&config(server.url(), 100)).unwrap();
    let start = Instant::now();
    let response = client.get("tickets/1", &[]).await.unwrap();

    assert!(start.elapsed() >= Duration::from_millis(100));
    assert_eq!(response.body, json!({"id": 1, "subject": "Printer"}));
    unavailable.assert_async().await;
    ok.assert_async().await;
}

#[tokio::test]
async fn test_not_found_fails_without_retry() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/tickets/999")
        .with_status(404)
        .with_body(r#"{"description": "Record not found"}"#)
        .expect(1)
        .create_async()
        .await;

    let client = FreshdeskClient::new(&config(server.url(), 1)).unwrap();
    let err = client.get("tickets/999", &[]).await.unwrap_err();
    mock.assert_async().await;

    match err {
        FreshdeskError::Transport {
            status, payload, ..
        } => {
            assert_eq!(status, Some(404));
            assert_eq!(payload, Some(json!({"description": "Record not found"})));
        }
        other => panic!("expected transport error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_rate_limit_honours_retry_after() {
    let mut server = mockito::Server::new_async().await;
    let limited = server
        .mock("GET", "/tickets")
        .with_status(429)
        .with_header("retry-after", "0")
        .expect(1)
        .create_async()
        .await;
    let ok = server
        .mock("GET", "/tickets")
        .with_status(200)
        .with_body("[]")
        .expect(1)
        .create_async()
        .await;

    // a large backoff proves Retry-After took precedence
    let client = FreshdeskClient::new(&config(server.url(), 10_000)).unwrap();
    let start = Instant::now();
    let response = client.get("tickets", &[]).await.unwrap();

    assert!(start.elapsed() < Duration::from_secs(5));
    assert_eq!(response.body, json!([]));
    limited.assert_async().await;
    ok.assert_async().await;
}

#[tokio::test]
async fn test_retry_after_is_capped() {
    let mut server = mockito::Server::new_async().await;
    let _m = server
        .mock("GET", "/tickets")
        .with_status(429)
        .with_header("retry-after", "3600")
        .expect(1)
        .create_async()
        .await;
    let _m = server
        .mock("GET", "/tickets")
        .with_status(200)
        .with_body("[]")
        .create_async()
        .await;

    let mut config = config(server.url(), 1);
    config.max_retry_after_secs = 0;
    let client = FreshdeskClient::new(&config).unwrap();

    let start = Instant::now();
    assert!(client.get("tickets", &[]).await.is_ok());
    assert!(start.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_exhaustion_surfaces_last_status() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/tickets/1")
        .with_status(503)
        .with_body(r#"{"code": "maintenance"}"#)
        .expect(3)
        .create_async()
        .await;

    let client = FreshdeskClient::new(&config(server.url(), 1)).unwrap();
    let err = client.get("tickets/1", &[]).await.unwrap_err();
    mock.assert_async().await;

    let payload = err.to_payload();
    assert_eq!(payload["error"]["status"], 503);
    assert_eq!(payload["error"]["payload"]["code"], "maintenance");
}

#[tokio::test]
async fn test_connection_refused_is_retried_then_reported() {
    // nothing listens on port 1
    let mut config = config("http://127.0.0.1:1/api/v2".to_string(), 1);
    config.max_attempts = 2;
    let client = FreshdeskClient::new(&config).unwrap();

    let err = client.get("tickets", &[]).await.unwrap_err();
    match err {
        FreshdeskError::Transport { status, .. } => assert_eq!(status, None),
        other => panic!("expected transport error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_empty_success_body_is_null() {
    let mut server = mockito::Server::new_async().await;
    let _m = server
        .mock("DELETE", "/tickets/5")
        .with_status(204)
        .create_async()
        .await;

    let client = FreshdeskClient::new(&config(server.url(), 1)).unwrap();
    let response = client
        .execute(reqwest::Method::DELETE, "tickets/5", &[], None)
        .await
        .unwrap();

    assert_eq!(response.status.as_u16(), 204);
    assert!(response.body.is_null());
}

#[tokio::test]
async fn test_requests_carry_basic_auth_and_user_agent() {
    let mut server = mockito::Server::new_async().await;
    // base64("test-key:X")
    let mock = server
        .mock("GET", "/agents/me")
        .match_header("authorization", "Basic dGVzdC1rZXk6WA==")
        .match_header("user-agent", freshdesk_mcp::client::USER_AGENT)
        .with_status(200)
        .with_body("{}")
        .create_async()
        .await;

    let client = FreshdeskClient::new(&config(server.url(), 1)).unwrap();
    client.get("agents/me", &[]).await.unwrap();
    mock.assert_async().await;
}
