//! Mock Code Engine API server.
//!
//! Provides an axum-based HTTP server that simulates the Code Engine v2 API
//! and the IAM token endpoint.

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use super::fixtures::Fixtures;
use super::handlers::{
    self, create_resource, delete_resource, get_resource, list_resources, replace_resource,
    update_resource,
};
use super::state::MockState;
use crate::{App, Build, BuildRun, ConfigMap, Job, JobRun, Secret};

/// A mock Code Engine API server for testing.
///
/// The server runs in the background and can be used to test the client
/// against a stateful API implementation.
pub struct MockServer {
    /// Root URL of the listener (IAM lives here).
    root: String,
    /// Service URL, the root plus `/v2`.
    url: String,
    /// Handle to the server task.
    handle: JoinHandle<()>,
    /// Shared state that can be modified during tests.
    state: Arc<RwLock<MockState>>,
}

impl MockServer {
    /// Start a new mock server with default fixtures.
    ///
    /// The server listens on a random available port and returns immediately.
    /// Use `url()` to get the service URL.
    pub async fn start() -> Self {
        Self::with_state(Fixtures::default_scenario().into_state()).await
    }

    /// Start a mock server with empty state.
    ///
    /// Useful when you want to control exactly what data is available.
    pub async fn start_empty() -> Self {
        Self::with_state(MockState::new()).await
    }

    /// Start a mock server with custom state.
    pub async fn with_state(state: MockState) -> Self {
        let shared_state = state.shared();
        let app = router(shared_state.clone());

        // Bind to a random available port
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to address");
        let addr = listener.local_addr().expect("Failed to get local address");

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Server error");
        });

        let root = format!("http://{}", addr);
        Self {
            url: format!("{}/v2", root),
            root,
            handle,
            state: shared_state,
        }
    }

    /// Get the service URL of the mock server.
    ///
    /// Use this URL when creating a `CodeEngineClient` for testing.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Base URL for `IamAuthenticator::with_url`.
    pub fn iam_url(&self) -> &str {
        &self.root
    }

    /// Get access to the server's shared state.
    ///
    /// This allows modifying the mock data during a test.
    pub fn state(&self) -> Arc<RwLock<MockState>> {
        self.state.clone()
    }

    /// Shutdown the server.
    ///
    /// This aborts the server task. It's safe to call multiple times.
    pub async fn shutdown(self) {
        self.handle.abort();
        let _ = self.handle.await;
    }
}

/// Build the router with all routes.
pub(crate) fn router(state: Arc<RwLock<MockState>>) -> Router {
    let api = Router::new()
        // Projects
        .route("/projects", get(handlers::list_projects).post(handlers::create_project))
        .route(
            "/projects/:project_id",
            get(handlers::get_project).delete(handlers::delete_project),
        )
        .route("/projects/:project_id/egress_ips", get(handlers::get_project_egress_ips))
        .route(
            "/projects/:project_id/status_details",
            get(handlers::get_project_status_details),
        )
        // Apps
        .route(
            "/projects/:project_id/apps",
            get(list_resources::<App>).post(create_resource::<App>),
        )
        .route(
            "/projects/:project_id/apps/:name",
            get(get_resource::<App>)
                .patch(update_resource::<App>)
                .delete(delete_resource::<App>),
        )
        .route(
            "/projects/:project_id/apps/:name/revisions",
            get(handlers::list_app_revisions),
        )
        .route(
            "/projects/:project_id/apps/:name/revisions/:revision",
            get(handlers::get_app_revision).delete(handlers::delete_app_revision),
        )
        .route(
            "/projects/:project_id/apps/:name/instances",
            get(handlers::list_app_instances),
        )
        // Jobs
        .route(
            "/projects/:project_id/jobs",
            get(list_resources::<Job>).post(create_resource::<Job>),
        )
        .route(
            "/projects/:project_id/jobs/:name",
            get(get_resource::<Job>)
                .patch(update_resource::<Job>)
                .delete(delete_resource::<Job>),
        )
        .route(
            "/projects/:project_id/job_runs",
            get(list_resources::<JobRun>).post(handlers::create_job_run),
        )
        .route(
            "/projects/:project_id/job_runs/:name",
            get(get_resource::<JobRun>).delete(delete_resource::<JobRun>),
        )
        // Builds
        .route(
            "/projects/:project_id/builds",
            get(list_resources::<Build>).post(create_resource::<Build>),
        )
        .route(
            "/projects/:project_id/builds/:name",
            get(get_resource::<Build>)
                .patch(update_resource::<Build>)
                .delete(delete_resource::<Build>),
        )
        .route(
            "/projects/:project_id/build_runs",
            get(list_resources::<BuildRun>).post(handlers::create_build_run),
        )
        .route(
            "/projects/:project_id/build_runs/:name",
            get(get_resource::<BuildRun>).delete(delete_resource::<BuildRun>),
        )
        // Config maps and secrets
        .route(
            "/projects/:project_id/config_maps",
            get(list_resources::<ConfigMap>).post(create_resource::<ConfigMap>),
        )
        .route(
            "/projects/:project_id/config_maps/:name",
            get(get_resource::<ConfigMap>)
                .put(replace_resource::<ConfigMap>)
                .delete(delete_resource::<ConfigMap>),
        )
        .route(
            "/projects/:project_id/secrets",
            get(list_resources::<Secret>).post(create_resource::<Secret>),
        )
        .route(
            "/projects/:project_id/secrets/:name",
            get(get_resource::<Secret>)
                .put(replace_resource::<Secret>)
                .delete(delete_resource::<Secret>),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            handlers::require_token,
        ))
        // Health check stays reachable without a token
        .route("/health", get(health_check));

    Router::new()
        .nest("/v2", api)
        .route("/identity/token", post(handlers::issue_iam_token))
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "ok"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        CodeEngineClient, Get, IamAuthenticator, List, Project, ProjectListQuery, ResourceId,
    };
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_server_starts_and_responds() {
        let server = MockServer::start().await;

        let client = reqwest::Client::new();
        let response = client
            .get(format!("{}/health", server.url()))
            .send()
            .await
            .expect("Failed to send request");

        assert!(response.status().is_success());
        assert_eq!(response.text().await.unwrap(), "ok");

        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_get_project_with_client() {
        let server = MockServer::start().await;
        let client = CodeEngineClient::new("test-token", server.url()).unwrap();

        let project = Project::get(&client, Fixtures::DEFAULT_PROJECT_ID.to_string())
            .await
            .expect("Failed to get project");

        assert_eq!(project.name, "test-project");
        assert!(project.is_active());

        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_list_projects_with_client() {
        let server = MockServer::start().await;
        let client = CodeEngineClient::new("test-token", server.url()).unwrap();

        let page = Project::list_page(&client, &ProjectListQuery::default(), None, 1)
            .await
            .expect("Failed to list projects");

        assert_eq!(page.items.len(), 1);
        assert!(page.has_more);

        let cursor = page.next_start.as_deref();
        let next = Project::list_page(&client, &ProjectListQuery::default(), cursor, 1)
            .await
            .expect("Failed to list second page");
        assert_eq!(next.items.len(), 1);
        assert!(!next.has_more);
        assert_ne!(page.items[0].id, next.items[0].id);

        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_empty_server() {
        let server = MockServer::start_empty().await;
        let client = CodeEngineClient::new("test-token", server.url()).unwrap();

        let result = Project::get(&client, "nonexistent".to_string()).await;

        assert!(matches!(result, Err(crate::CodeEngineError::NotFound { .. })));

        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_custom_state() {
        let state = MockState::new()
            .with_project(Fixtures::project("p1", "custom"))
            .with("p1", Fixtures::app("p1", "api", "nginx"));

        let server = MockServer::with_state(state).await;
        let client = CodeEngineClient::new("test-token", server.url()).unwrap();

        let app = App::get(&client, ResourceId::new("p1", "api"))
            .await
            .expect("Failed to get app");

        assert_eq!(app.image_reference, "nginx");

        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_required_token_rejects_other_tokens() {
        let state = MockState::new()
            .with_project(Fixtures::project("p1", "guarded"))
            .with_required_token("s3cret");
        let server = MockServer::with_state(state).await;

        let wrong = CodeEngineClient::new("nope", server.url()).unwrap();
        let result = Project::get(&wrong, "p1".to_string()).await;
        assert_eq!(result.unwrap_err().status_code(), Some(401));

        let right = CodeEngineClient::new("s3cret", server.url()).unwrap();
        assert!(Project::get(&right, "p1".to_string()).await.is_ok());

        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_iam_flow_against_mock() {
        let state = MockState::new()
            .with_project(Fixtures::project("p1", "guarded"))
            .with_required_token("issued-token");
        let server = MockServer::with_state(state).await;

        let client = CodeEngineClient::builder()
            .service_url(server.url())
            .authenticator(IamAuthenticator::with_url("any-key", server.iam_url()))
            .build()
            .unwrap();

        let project = Project::get(&client, "p1".to_string()).await.unwrap();
        assert_eq!(project.name, "guarded");

        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_router_rejects_oversized_limit() {
        let app = router(Fixtures::default_scenario().into_state().shared());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/v2/projects?limit=101")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_router_health_skips_auth() {
        let app = router(MockState::new().with_required_token("t").shared());

        let response = app
            .oneshot(Request::builder().uri("/v2/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }
}
