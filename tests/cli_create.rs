//! Execution tests for the create operations.
//!
//! Uses wiremock to mock the Code Engine API and test actual execution flow.

use codeengine::{
    submit_build_run, submit_job_run, App, AppCreateParams, CodeEngineClient, CodeEngineError,
    ConfigMap, ConfigMapCreateParams, Create, JobRun, JobRunCreateParams, Project,
    ProjectCreateParams, Secret, SecretCreateParams, SecretFormat,
};
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PROJECT_ID: &str = "15314cc3-85b4-4338-903f-c28cdee6d005";

#[tokio::test]
async fn test_create_project_accepts_202() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/projects"))
        .and(body_json(serde_json::json!({"name": "new-project"})))
        .respond_with(ResponseTemplate::new(202).set_body_json(serde_json::json!({
            "id": "d1b3f5f0-0000-4000-8000-000000000001",
            "name": "new-project",
            "status": "creating"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = CodeEngineClient::new("test-token", &mock_server.uri()).unwrap();
    let project = Project::create(&client, ProjectCreateParams::new("new-project"))
        .await
        .unwrap();

    assert_eq!(project.name, "new-project");
    assert!(!project.is_active());
}

#[tokio::test]
async fn test_create_app_omits_unset_fields() {
    let mock_server = MockServer::start().await;

    // project_id travels in the path, never in the body
    Mock::given(method("POST"))
        .and(path(format!("/projects/{PROJECT_ID}/apps")))
        .and(body_json(serde_json::json!({
            "name": "hello",
            "image_reference": "icr.io/codeengine/helloworld",
            "image_port": 8080
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "name": "hello",
            "entity_tag": "1",
            "image_reference": "icr.io/codeengine/helloworld",
            "image_port": 8080,
            "status": "deploying"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = CodeEngineClient::new("test-token", &mock_server.uri()).unwrap();
    let mut params = AppCreateParams::new(PROJECT_ID, "hello", "icr.io/codeengine/helloworld");
    params.image_port = Some(8080);

    let app = App::create(&client, params).await.unwrap();
    assert_eq!(app.image_port, Some(8080));
    assert!(!app.is_ready());
}

#[tokio::test]
async fn test_create_app_validates_before_sending() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&mock_server)
        .await;

    let client = CodeEngineClient::new("test-token", &mock_server.uri()).unwrap();
    let err = App::create(&client, AppCreateParams::new(PROJECT_ID, "hello", ""))
        .await
        .unwrap_err();

    assert!(matches!(err, CodeEngineError::InvalidArgument(_)));
}

#[tokio::test]
async fn test_create_config_map_with_entries() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!("/projects/{PROJECT_ID}/config_maps")))
        .and(body_json(serde_json::json!({
            "name": "settings",
            "data": {"LOG_LEVEL": "debug"}
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "name": "settings",
            "entity_tag": "1",
            "data": {"LOG_LEVEL": "debug"}
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = CodeEngineClient::new("test-token", &mock_server.uri()).unwrap();
    let params =
        ConfigMapCreateParams::new(PROJECT_ID, "settings").with_entry("LOG_LEVEL", "debug");

    let config_map = ConfigMap::create(&client, params).await.unwrap();
    assert_eq!(config_map.get_value("LOG_LEVEL"), Some("debug"));
}

#[tokio::test]
async fn test_create_secret_sends_format() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!("/projects/{PROJECT_ID}/secrets")))
        .and(body_json(serde_json::json!({
            "name": "registry",
            "format": "registry",
            "data": {"password": "key", "server": "de.icr.io", "username": "iamapikey"}
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "name": "registry",
            "entity_tag": "1",
            "format": "registry",
            "data": {"password": "key", "server": "de.icr.io", "username": "iamapikey"}
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = CodeEngineClient::new("test-token", &mock_server.uri()).unwrap();
    let params = SecretCreateParams::new(PROJECT_ID, "registry", SecretFormat::Registry)
        .with_entry("server", "de.icr.io")
        .with_entry("username", "iamapikey")
        .with_entry("password", "key");

    let secret = Secret::create(&client, params).await.unwrap();
    assert_eq!(secret.format, SecretFormat::Registry);
    // Debug output never carries secret values
    assert!(!format!("{secret:?}").contains("de.icr.io"));
}

#[tokio::test]
async fn test_submit_job_run_for_job() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!("/projects/{PROJECT_ID}/job_runs")))
        .and(body_json(serde_json::json!({"job_name": "nightly"})))
        .respond_with(ResponseTemplate::new(202).set_body_json(serde_json::json!({
            "name": "nightly-abcde",
            "job_name": "nightly",
            "status": "pending"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = CodeEngineClient::new("test-token", &mock_server.uri()).unwrap();
    let run = submit_job_run(&client, PROJECT_ID, "nightly").await.unwrap();

    assert_eq!(run.job_name.as_deref(), Some("nightly"));
    assert!(!run.is_finished());
}

#[tokio::test]
async fn test_job_run_needs_job_or_image() {
    let mock_server = MockServer::start().await;
    let client = CodeEngineClient::new("test-token", &mock_server.uri()).unwrap();

    let params = JobRunCreateParams {
        project_id: PROJECT_ID.to_string(),
        ..Default::default()
    };
    let err = JobRun::create(&client, params).await.unwrap_err();
    assert!(matches!(err, CodeEngineError::InvalidArgument(_)));

    let err = submit_build_run(&client, PROJECT_ID, "").await.unwrap_err();
    assert!(matches!(err, CodeEngineError::InvalidArgument(_)));
}
