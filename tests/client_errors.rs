//! Error mapping, retries and request decoration.

use std::time::Duration;

use codeengine::{
    get_project, BearerTokenAuthenticator, CodeEngineClient, CodeEngineError, Get, Project,
    RetryPolicy,
};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_with_retries(uri: &str, retries: u32) -> CodeEngineClient {
    CodeEngineClient::builder()
        .service_url(uri)
        .authenticator(BearerTokenAuthenticator::new("test-token"))
        .retry(RetryPolicy::new(retries, Duration::from_millis(50)))
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_server_error_carries_message_and_trace() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/projects/p1"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "errors": [{"code": "invalid_id", "message": "project id is malformed"}],
            "status_code": 400,
            "trace": "trace-42"
        })))
        .mount(&mock_server)
        .await;

    let client = CodeEngineClient::new("test-token", &mock_server.uri()).unwrap();
    let err = get_project(&client, "p1").await.unwrap_err();

    assert_eq!(err.status_code(), Some(400));
    match err {
        CodeEngineError::ApiError { message, trace, .. } => {
            assert_eq!(message, "project id is malformed");
            assert_eq!(trace.as_deref(), Some("trace-42"));
        }
        other => panic!("expected ApiError, got {other:?}"),
    }
}

#[tokio::test]
async fn test_plain_text_error_body_is_kept() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/projects/p1"))
        .respond_with(
            ResponseTemplate::new(502)
                .set_body_string("upstream unavailable")
                .insert_header("x-correlation-id", "corr-1"),
        )
        .mount(&mock_server)
        .await;

    let client = CodeEngineClient::new("test-token", &mock_server.uri()).unwrap();
    let err = Project::get(&client, "p1".to_string()).await.unwrap_err();

    match err {
        CodeEngineError::ApiError {
            message,
            status_code,
            trace,
        } => {
            assert_eq!(message, "upstream unavailable");
            assert_eq!(status_code, Some(502));
            assert_eq!(trace.as_deref(), Some("corr-1"));
        }
        other => panic!("expected ApiError, got {other:?}"),
    }
}

#[tokio::test]
async fn test_rate_limit_without_retries() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/projects/p1"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "7"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = CodeEngineClient::new("test-token", &mock_server.uri()).unwrap();
    let err = Project::get(&client, "p1".to_string()).await.unwrap_err();

    assert!(matches!(
        err,
        CodeEngineError::RateLimited {
            retry_after_secs: Some(7)
        }
    ));
}

#[tokio::test]
async fn test_retries_transient_failures() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/projects/p1"))
        .respond_with(ResponseTemplate::new(503).insert_header("retry-after", "0"))
        .up_to_n_times(2)
        .expect(2)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/projects/p1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "p1",
            "name": "eventually"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_with_retries(&mock_server.uri(), 3);
    let project = Project::get(&client, "p1".to_string()).await.unwrap();

    assert_eq!(project.name, "eventually");
}

#[tokio::test]
async fn test_retries_give_up_after_limit() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/projects/p1"))
        .respond_with(ResponseTemplate::new(500).insert_header("retry-after", "0"))
        .expect(3)
        .mount(&mock_server)
        .await;

    let client = client_with_retries(&mock_server.uri(), 2);
    let err = Project::get(&client, "p1".to_string()).await.unwrap_err();

    assert_eq!(err.status_code(), Some(500));
}

#[tokio::test]
async fn test_client_errors_are_not_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/projects/p1"))
        .respond_with(ResponseTemplate::new(412))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_with_retries(&mock_server.uri(), 3);
    let err = Project::get(&client, "p1".to_string()).await.unwrap_err();

    assert!(err.is_precondition_failed());
}

#[tokio::test]
async fn test_version_query_is_sent() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/projects/p1"))
        .and(query_param("version", "2024-11-18"))
        .and(header("accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "p1",
            "name": "versioned"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = CodeEngineClient::builder()
        .service_url(mock_server.uri())
        .authenticator(BearerTokenAuthenticator::new("test-token"))
        .version("2024-11-18")
        .build()
        .unwrap();

    let project = Project::get(&client, "p1".to_string()).await.unwrap();
    assert_eq!(project.name, "versioned");
}
