//! Mock Code Engine API server for E2E testing.
//!
//! This module provides an in-memory mock server that simulates the Code
//! Engine v2 API for integration and end-to-end testing. Unlike wiremock
//! which mocks at the HTTP level per-test, this server keeps state across
//! requests: created apps roll out revisions, `If-Match` is enforced against
//! stored entity tags, and list endpoints hand out real `start` cursors.
//!
//! # Example
//!
//! ```ignore
//! use codeengine::mock_server::{Fixtures, MockServer};
//! use codeengine::{CodeEngineClient, Get, Project};
//!
//! #[tokio::test]
//! async fn test_workflow() {
//!     let server = MockServer::start().await;
//!     let client = CodeEngineClient::new("test-token", server.url()).unwrap();
//!
//!     // Server comes with default fixtures
//!     let project_id = Fixtures::DEFAULT_PROJECT_ID.to_string();
//!     let project = Project::get(&client, project_id).await.unwrap();
//!     assert_eq!(project.name, "test-project");
//!
//!     server.shutdown().await;
//! }
//! ```

mod fixtures;
mod handlers;
mod server;
mod state;

pub use fixtures::{DefaultScenario, Fixtures, MOCK_REGION};
pub use server::MockServer;
pub use state::{MockResource, MockState, Scoped};
