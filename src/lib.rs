//! Code Engine API client library.
//!
//! A Rust library for the Code Engine v2 management API using a
//! trait-based architecture where each operation (Get, List, Create,
//! Update, Delete) is defined as a trait that resource types implement.
//!
//! # Quick Start
//!
//! ```no_run
//! use codeengine::{App, AppListQuery, CodeEngineClient, Get, List, Project, ResourceId};
//!
//! #[tokio::main]
//! async fn main() -> codeengine::Result<()> {
//!     // Create client from environment variables
//!     let client = CodeEngineClient::from_env()?;
//!
//!     // List all projects
//!     let projects = Project::list_all(&client, &Default::default()).await?;
//!     println!("Found {} projects", projects.len());
//!
//!     // Get an app of the first project
//!     if let Some(project) = projects.first() {
//!         let apps = App::list_all(&client, &AppListQuery::for_project(&project.id)).await?;
//!         for app in apps {
//!             let app = App::get(&client, ResourceId::new(&project.id, &app.name)).await?;
//!             println!("{} -> {:?}", app.name, app.endpoint);
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! The library is organized around five core traits:
//!
//! - [`Get`] - Fetch a single resource
//! - [`List`] - Fetch cursor-paginated collections
//! - [`Create`] - Provision a new resource
//! - [`Update`] - Modify a resource guarded by `If-Match`
//! - [`Delete`] - Remove a resource
//!
//! Each resource type (like [`Project`] or [`App`]) implements the traits
//! supported by its endpoints. [`Pager`] walks any listable collection one
//! page at a time.
//!
//! # Configuration
//!
//! [`CodeEngineClient::from_env`] reads:
//!
//! - `CODE_ENGINE_URL` or `CODE_ENGINE_REGION` - Service endpoint (defaults to au-syd)
//! - `CODE_ENGINE_AUTH_TYPE` - `iam` (default), `bearertoken` or `noauth`
//! - `CODE_ENGINE_APIKEY` / `CODE_ENGINE_AUTH_URL` - IAM API key and token endpoint
//! - `CODE_ENGINE_BEARER_TOKEN` - Static bearer token
//! - `CODE_ENGINE_VERSION` - API `version` date sent with every request
//! - `CODE_ENGINE_MAX_RETRIES` - Enables retries of transient failures

mod auth;
mod client;
mod error;
mod models;
mod pagination;
mod retry;
mod traits;

pub mod cli;
pub mod mcp;
pub mod output;

#[cfg(feature = "test-server")]
pub mod mock_server;

// Re-export core types
pub use auth::{
    Authenticator, BearerTokenAuthenticator, IamAuthenticator, NoAuthAuthenticator,
    DEFAULT_IAM_URL,
};
pub use client::{
    service_url_for_region, ClientBuilder, CodeEngineClient, DEFAULT_SERVICE_URL, REGIONS,
};
pub use error::{CodeEngineError, Result};
pub use pagination::{Page, PageLink, Pager, PaginationParams, MAX_PAGE_SIZE};
pub use retry::{RetryPolicy, DEFAULT_MAX_RETRY_INTERVAL};

// Re-export traits
pub use traits::{Create, Delete, Get, List, Update, DEFAULT_PAGE_SIZE};

// Re-export models
pub use models::{
    // Shared types
    EnvVar,
    EnvVarType,
    Probe,
    ResourceId,
    VolumeMount,
    VolumeMountType,
    // Project types
    Project,
    ProjectCreateParams,
    ProjectEgressIpAddresses,
    ProjectListQuery,
    ProjectStatusDetails,
    // App types
    App,
    AppCreateParams,
    AppInstance,
    AppInstanceListQuery,
    AppListQuery,
    AppRevision,
    AppRevisionId,
    AppRevisionListQuery,
    AppRevisionStatusDetails,
    AppStatusDetails,
    AppUpdateParams,
    ContainerStatus,
    ContainerStatusDetails,
    // Job types
    Job,
    JobCreateParams,
    JobListQuery,
    JobRun,
    JobRunCreateParams,
    JobRunListQuery,
    JobRunStatusDetails,
    JobUpdateParams,
    // Build types
    Build,
    BuildCreateParams,
    BuildListQuery,
    BuildRun,
    BuildRunCreateParams,
    BuildRunListQuery,
    BuildRunStatusDetails,
    BuildStatusDetails,
    BuildUpdateParams,
    // Config map and secret types
    ConfigMap,
    ConfigMapCreateParams,
    ConfigMapListQuery,
    ConfigMapReplaceParams,
    Secret,
    SecretCreateParams,
    SecretFormat,
    SecretListQuery,
    SecretReplaceParams,
};

// Re-export convenience functions
pub use models::{
    create_project, delete_project, get_project, get_project_egress_ips,
    get_project_status_details, list_projects,
};
pub use models::{
    delete_app, delete_app_revision, get_app, get_app_revision, list_app_instances,
    list_app_revisions, list_apps,
};
pub use models::{
    delete_job, delete_job_run, get_job, get_job_run, list_job_runs, list_jobs, submit_job_run,
};
pub use models::{
    delete_build, delete_build_run, get_build, get_build_run, list_build_runs, list_builds,
    submit_build_run,
};
pub use models::{delete_config_map, get_config_map, list_config_maps, replace_config_map};
pub use models::{delete_secret, get_secret, list_secrets, replace_secret};
