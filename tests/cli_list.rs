//! Execution tests for the list operations and cursor pagination.
//!
//! Uses wiremock to mock the Code Engine API and test actual execution flow.

use codeengine::{
    list_build_runs, list_job_runs, App, AppListQuery, CodeEngineClient, CodeEngineError,
    JobRun, JobRunListQuery, List, Pager, Project, ProjectListQuery,
};
use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PROJECT_ID: &str = "15314cc3-85b4-4338-903f-c28cdee6d005";

fn project(name: &str) -> serde_json::Value {
    serde_json::json!({ "id": format!("id-{name}"), "name": name, "status": "active" })
}

#[tokio::test]
async fn test_list_projects_returns_page() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/projects"))
        .and(query_param("limit", "20"))
        .and(query_param_is_missing("start"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "limit": 20,
            "first": {"href": "https://api.eu-de.codeengine.cloud.ibm.com/v2/projects?limit=20"},
            "projects": [project("one"), project("two")]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = CodeEngineClient::new("test-token", &mock_server.uri()).unwrap();
    let page = Project::list_page(&client, &ProjectListQuery::default(), None, 20)
        .await
        .unwrap();

    assert_eq!(page.items.len(), 2);
    assert_eq!(page.items[0].name, "one");
    assert!(!page.has_more);
    assert!(page.next_start.is_none());
}

#[tokio::test]
async fn test_list_page_sends_start_and_reads_next() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("/projects/{PROJECT_ID}/apps")))
        .and(query_param("limit", "1"))
        .and(query_param("start", "cursor-a"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "limit": 1,
            "apps": [{"name": "b", "image_reference": "nginx"}],
            "next": {
                "href": "https://x/v2/projects/p/apps?limit=1&start=cursor-b",
                "start": "cursor-b"
            }
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = CodeEngineClient::new("test-token", &mock_server.uri()).unwrap();
    let page = App::list_page(&client, &AppListQuery::for_project(PROJECT_ID), Some("cursor-a"), 1)
        .await
        .unwrap();

    assert_eq!(page.items[0].name, "b");
    assert!(page.has_more);
    assert_eq!(page.next_start.as_deref(), Some("cursor-b"));
}

#[tokio::test]
async fn test_next_cursor_falls_back_to_href() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/projects"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "limit": 1,
            "projects": [project("one")],
            "next": {
                "href": "https://api.eu-de.codeengine.cloud.ibm.com/v2/projects?limit=1&start=from-href"
            }
        })))
        .mount(&mock_server)
        .await;

    let client = CodeEngineClient::new("test-token", &mock_server.uri()).unwrap();
    let page = Project::list_page(&client, &ProjectListQuery::default(), None, 1)
        .await
        .unwrap();

    assert_eq!(page.next_start.as_deref(), Some("from-href"));
}

#[tokio::test]
async fn test_list_all_follows_cursors() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/projects"))
        .and(query_param_is_missing("start"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "limit": 100,
            "projects": [project("one"), project("two")],
            "next": {"start": "page-2"}
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/projects"))
        .and(query_param("start", "page-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "limit": 100,
            "projects": [project("three")]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = CodeEngineClient::new("test-token", &mock_server.uri()).unwrap();
    let all = Project::list_all(&client, &ProjectListQuery::default()).await.unwrap();

    let names: Vec<_> = all.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["one", "two", "three"]);
}

#[tokio::test]
async fn test_pager_walks_pages_then_refuses() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/projects"))
        .and(query_param("limit", "2"))
        .and(query_param_is_missing("start"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "limit": 2,
            "projects": [project("one"), project("two")],
            "next": {"start": "s2"}
        })))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/projects"))
        .and(query_param("start", "s2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "limit": 2,
            "projects": [project("three")]
        })))
        .mount(&mock_server)
        .await;

    let client = CodeEngineClient::new("test-token", &mock_server.uri()).unwrap();
    let mut pager = Pager::<Project>::with_limit(&client, ProjectListQuery::default(), 2);

    assert!(pager.has_next());
    assert_eq!(pager.get_next().await.unwrap().len(), 2);
    assert!(pager.has_next());
    assert_eq!(pager.get_next().await.unwrap().len(), 1);
    assert!(!pager.has_next());

    let err = pager.get_next().await.unwrap_err();
    assert!(matches!(err, CodeEngineError::InvalidArgument(_)));
}

#[tokio::test]
async fn test_pager_get_all_from_mid_collection() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/projects"))
        .and(query_param_is_missing("start"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "projects": [project("one")],
            "next": {"start": "s2"}
        })))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/projects"))
        .and(query_param("start", "s2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "projects": [project("two"), project("three")]
        })))
        .mount(&mock_server)
        .await;

    let client = CodeEngineClient::new("test-token", &mock_server.uri()).unwrap();
    let mut pager = Pager::<Project>::new(&client, ProjectListQuery::default());

    let first = pager.get_next().await.unwrap();
    let rest = pager.get_all().await.unwrap();

    assert_eq!(first.len(), 1);
    assert_eq!(rest.len(), 2);
    assert!(!pager.has_next());
}

#[tokio::test]
async fn test_pager_clamps_limit() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/projects"))
        .and(query_param("limit", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"projects": []})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = CodeEngineClient::new("test-token", &mock_server.uri()).unwrap();
    let mut pager = Pager::<Project>::with_limit(&client, ProjectListQuery::default(), 500);

    assert!(pager.get_next().await.unwrap().is_empty());
    assert!(!pager.has_next());
}

#[tokio::test]
async fn test_list_job_runs_filters_by_job() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("/projects/{PROJECT_ID}/job_runs")))
        .and(query_param("job_name", "nightly"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "job_runs": [{"name": "nightly-run-1", "job_name": "nightly", "status": "completed"}]
        })))
        .expect(2)
        .mount(&mock_server)
        .await;

    let client = CodeEngineClient::new("test-token", &mock_server.uri()).unwrap();

    let runs = list_job_runs(&client, PROJECT_ID, Some("nightly")).await.unwrap();
    assert_eq!(runs.len(), 1);
    assert!(runs[0].is_finished());

    let query = JobRunListQuery::for_project(PROJECT_ID).with_job_name("nightly");
    let page = JobRun::list_page(&client, &query, None, 10).await.unwrap();
    assert_eq!(page.items[0].job_name.as_deref(), Some("nightly"));
}

#[tokio::test]
async fn test_list_build_runs_without_filter() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("/projects/{PROJECT_ID}/build_runs")))
        .and(query_param_is_missing("build_name"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "build_runs": [
                {"name": "r1", "build_name": "a", "status": "succeeded"},
                {"name": "r2", "build_name": "b", "status": "failed"}
            ]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = CodeEngineClient::new("test-token", &mock_server.uri()).unwrap();
    let runs = list_build_runs(&client, PROJECT_ID, None).await.unwrap();

    assert_eq!(runs.len(), 2);
    assert!(runs[0].is_succeeded());
    assert!(!runs[1].is_succeeded());
}

#[tokio::test]
async fn test_list_requires_project_id() {
    let mock_server = MockServer::start().await;
    let client = CodeEngineClient::new("test-token", &mock_server.uri()).unwrap();

    let err = App::list_page(&client, &AppListQuery::default(), None, 10)
        .await
        .unwrap_err();
    assert!(matches!(err, CodeEngineError::InvalidArgument(_)));
}
