//! App, app revision and app instance models and trait implementations.
//!
//! An app is a long-running, HTTP-reachable workload that scales with
//! traffic. Every configuration change creates a new immutable revision;
//! running containers of a revision are its instances.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

use crate::client::{resource_path, CodeEngineClient};
use crate::error::{require, CodeEngineError, Result};
use crate::models::common::{collection_path, EnvVar, Probe, ResourceId, VolumeMount};
use crate::pagination::{Page, PageLink, PaginationParams};
use crate::traits::{Create, Delete, Get, List, Update};

/// A Code Engine app.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct App {
    /// App name, unique within the project.
    pub name: String,

    /// Server-generated ID.
    #[serde(default)]
    pub id: Option<String>,

    /// Owning project.
    #[serde(default)]
    pub project_id: Option<String>,

    #[serde(default)]
    pub region: Option<String>,

    #[serde(default)]
    pub href: Option<String>,

    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,

    /// Always "app_v2".
    #[serde(default)]
    pub resource_type: Option<String>,

    /// Version tag required by `If-Match` on updates.
    #[serde(default)]
    pub entity_tag: String,

    /// Container image (e.g., "icr.io/codeengine/helloworld").
    pub image_reference: String,

    /// Port the container listens on.
    #[serde(default)]
    pub image_port: Option<u16>,

    /// Registry secret used to pull the image.
    #[serde(default)]
    pub image_secret: Option<String>,

    /// Public URL of the app.
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Cluster-local URL of the app.
    #[serde(default)]
    pub endpoint_internal: Option<String>,

    /// Visibility: "local", "local_private" or "local_public".
    #[serde(default)]
    pub managed_domain_mappings: Option<String>,

    #[serde(default)]
    pub probe_liveness: Option<Probe>,

    #[serde(default)]
    pub probe_readiness: Option<Probe>,

    #[serde(default)]
    pub run_arguments: Vec<String>,

    #[serde(default)]
    pub run_as_user: Option<u32>,

    #[serde(default)]
    pub run_commands: Vec<String>,

    #[serde(default)]
    pub run_compute_resource_token_enabled: Option<bool>,

    #[serde(default)]
    pub run_env_variables: Vec<EnvVar>,

    /// Variables injected by the platform (e.g., `CE_APP`).
    #[serde(default)]
    pub computed_env_variables: Vec<EnvVar>,

    #[serde(default)]
    pub run_service_account: Option<String>,

    #[serde(default)]
    pub run_volume_mounts: Vec<VolumeMount>,

    /// Maximum concurrent requests per instance.
    #[serde(default)]
    pub scale_concurrency: Option<u32>,

    /// Concurrency at which the autoscaler adds instances.
    #[serde(default)]
    pub scale_concurrency_target: Option<u32>,

    /// CPU per instance (e.g., "1").
    #[serde(default)]
    pub scale_cpu_limit: Option<String>,

    /// Seconds to wait before scaling down.
    #[serde(default)]
    pub scale_down_delay: Option<u32>,

    #[serde(default)]
    pub scale_ephemeral_storage_limit: Option<String>,

    #[serde(default)]
    pub scale_initial_instances: Option<u32>,

    #[serde(default)]
    pub scale_max_instances: Option<u32>,

    /// Memory per instance (e.g., "4G").
    #[serde(default)]
    pub scale_memory_limit: Option<String>,

    #[serde(default)]
    pub scale_min_instances: Option<u32>,

    /// Request timeout in seconds.
    #[serde(default)]
    pub scale_request_timeout: Option<u32>,

    /// Name of the build that produced the image, if any.
    #[serde(default)]
    pub build: Option<String>,

    /// Name of the build run that produced the image, if any.
    #[serde(default)]
    pub build_run: Option<String>,

    /// "ready", "deploying", "failed" or "warning".
    #[serde(default)]
    pub status: Option<String>,

    #[serde(default)]
    pub status_details: Option<AppStatusDetails>,
}

/// Revision bookkeeping of an app.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppStatusDetails {
    #[serde(default)]
    pub latest_created_revision: Option<String>,
    #[serde(default)]
    pub latest_ready_revision: Option<String>,
    /// Why the app is not ready.
    #[serde(default)]
    pub reason: Option<String>,
}

impl App {
    /// Entity tag to pass as `If-Match` when updating.
    pub fn entity_tag(&self) -> &str {
        &self.entity_tag
    }

    /// Whether the latest revision is serving traffic.
    pub fn is_ready(&self) -> bool {
        self.status.as_deref() == Some("ready")
    }

    /// Whether the app failed to deploy.
    pub fn is_failed(&self) -> bool {
        self.status.as_deref() == Some("failed")
    }

    /// The revision currently serving traffic.
    pub fn latest_ready_revision(&self) -> Option<&str> {
        self.status_details
            .as_ref()
            .and_then(|d| d.latest_ready_revision.as_deref())
    }

    /// Get all revisions of this app.
    pub async fn revisions(&self, client: &CodeEngineClient) -> Result<Vec<AppRevision>> {
        let project_id = self.project_id.as_deref().unwrap_or_default();
        list_app_revisions(client, project_id, &self.name).await
    }

    /// Get all running instances of this app.
    pub async fn instances(&self, client: &CodeEngineClient) -> Result<Vec<AppInstance>> {
        let project_id = self.project_id.as_deref().unwrap_or_default();
        list_app_instances(client, project_id, &self.name).await
    }
}

/// Query parameters for listing apps.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AppListQuery {
    /// Project to list apps of.
    #[serde(skip)]
    pub project_id: String,
}

impl AppListQuery {
    pub fn for_project(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
        }
    }
}

/// Parameters for creating an app.
#[skip_serializing_none]
#[derive(Debug, Clone, Default, Serialize)]
pub struct AppCreateParams {
    /// Project to create the app in.
    #[serde(skip)]
    pub project_id: String,
    pub name: String,
    pub image_reference: String,
    pub image_port: Option<u16>,
    pub image_secret: Option<String>,
    pub managed_domain_mappings: Option<String>,
    pub probe_liveness: Option<Probe>,
    pub probe_readiness: Option<Probe>,
    pub run_arguments: Option<Vec<String>>,
    pub run_as_user: Option<u32>,
    pub run_commands: Option<Vec<String>>,
    pub run_compute_resource_token_enabled: Option<bool>,
    pub run_env_variables: Option<Vec<EnvVar>>,
    pub run_service_account: Option<String>,
    pub run_volume_mounts: Option<Vec<VolumeMount>>,
    pub scale_concurrency: Option<u32>,
    pub scale_concurrency_target: Option<u32>,
    pub scale_cpu_limit: Option<String>,
    pub scale_down_delay: Option<u32>,
    pub scale_ephemeral_storage_limit: Option<String>,
    pub scale_initial_instances: Option<u32>,
    pub scale_max_instances: Option<u32>,
    pub scale_memory_limit: Option<String>,
    pub scale_min_instances: Option<u32>,
    pub scale_request_timeout: Option<u32>,
}

impl AppCreateParams {
    pub fn new(
        project_id: impl Into<String>,
        name: impl Into<String>,
        image_reference: impl Into<String>,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            name: name.into(),
            image_reference: image_reference.into(),
            ..Default::default()
        }
    }
}

/// Merge-patch parameters for updating an app. Unset fields are left as they are.
#[skip_serializing_none]
#[derive(Debug, Clone, Default, Serialize)]
pub struct AppUpdateParams {
    pub image_reference: Option<String>,
    pub image_port: Option<u16>,
    pub image_secret: Option<String>,
    pub managed_domain_mappings: Option<String>,
    pub probe_liveness: Option<Probe>,
    pub probe_readiness: Option<Probe>,
    pub run_arguments: Option<Vec<String>>,
    pub run_as_user: Option<u32>,
    pub run_commands: Option<Vec<String>>,
    pub run_compute_resource_token_enabled: Option<bool>,
    pub run_env_variables: Option<Vec<EnvVar>>,
    pub run_service_account: Option<String>,
    pub run_volume_mounts: Option<Vec<VolumeMount>>,
    pub scale_concurrency: Option<u32>,
    pub scale_concurrency_target: Option<u32>,
    pub scale_cpu_limit: Option<String>,
    pub scale_down_delay: Option<u32>,
    pub scale_ephemeral_storage_limit: Option<String>,
    pub scale_initial_instances: Option<u32>,
    pub scale_max_instances: Option<u32>,
    pub scale_memory_limit: Option<String>,
    pub scale_min_instances: Option<u32>,
    pub scale_request_timeout: Option<u32>,
}

/// API response wrapper for listing apps.
#[derive(Debug, Deserialize)]
struct AppListResponse {
    #[serde(default)]
    apps: Vec<App>,
    #[serde(default)]
    limit: Option<u32>,
    #[serde(default)]
    next: Option<PageLink>,
}

#[async_trait]
impl Get for App {
    type Id = ResourceId;

    #[tracing::instrument(skip(client))]
    async fn get(client: &CodeEngineClient, id: ResourceId) -> Result<Self> {
        let path = id.path("apps")?;
        let response = client
            .get(&path)
            .await
            .map_err(|e| e.or_not_found("App", id.to_string()))?;
        let app: App = response.json().await.map_err(CodeEngineError::HttpError)?;
        Ok(app)
    }
}

#[async_trait]
impl List for App {
    type Query = AppListQuery;

    #[tracing::instrument(skip(client))]
    async fn list_page(
        client: &CodeEngineClient,
        query: &Self::Query,
        start: Option<&str>,
        limit: u32,
    ) -> Result<Page<Self>> {
        let path = collection_path(&query.project_id, "apps")?;
        let params = PaginationParams::new(start, limit);

        let response = client.get_with_query(&path, &params).await?;
        let data: AppListResponse = response.json().await.map_err(CodeEngineError::HttpError)?;

        Ok(Page::new(data.apps, data.limit.unwrap_or(limit), data.next.as_ref()))
    }
}

#[async_trait]
impl Create for App {
    type Params = AppCreateParams;

    #[tracing::instrument(skip(client))]
    async fn create(client: &CodeEngineClient, params: Self::Params) -> Result<Self> {
        let path = collection_path(&params.project_id, "apps")?;
        require("name", &params.name)?;
        require("image_reference", &params.image_reference)?;

        let response = client.post(&path, &params).await?;
        let app: App = response.json().await.map_err(CodeEngineError::HttpError)?;
        Ok(app)
    }
}

#[async_trait]
impl Update for App {
    type Id = ResourceId;
    type Params = AppUpdateParams;

    #[tracing::instrument(skip(client))]
    async fn update(
        client: &CodeEngineClient,
        id: ResourceId,
        if_match: &str,
        params: Self::Params,
    ) -> Result<Self> {
        let path = id.path("apps")?;
        require("if_match", if_match)?;

        let response = client
            .patch(&path, if_match, &params)
            .await
            .map_err(|e| e.or_not_found("App", id.to_string()))?;
        let app: App = response.json().await.map_err(CodeEngineError::HttpError)?;
        Ok(app)
    }
}

#[async_trait]
impl Delete for App {
    type Id = ResourceId;

    #[tracing::instrument(skip(client))]
    async fn delete(client: &CodeEngineClient, id: ResourceId) -> Result<()> {
        let path = id.path("apps")?;
        client
            .delete(&path)
            .await
            .map_err(|e| e.or_not_found("App", id.to_string()))?;
        Ok(())
    }
}

// =============================================================================
// App revisions
// =============================================================================

/// An immutable snapshot of an app's configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppRevision {
    /// Revision name (e.g., "my-app-00001").
    pub name: String,

    /// Owning app.
    #[serde(default)]
    pub app_name: Option<String>,

    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub project_id: Option<String>,

    #[serde(default)]
    pub region: Option<String>,

    #[serde(default)]
    pub href: Option<String>,

    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,

    /// Always "app_revision_v2".
    #[serde(default)]
    pub resource_type: Option<String>,

    #[serde(default)]
    pub image_reference: Option<String>,

    #[serde(default)]
    pub image_port: Option<u16>,

    #[serde(default)]
    pub run_env_variables: Vec<EnvVar>,

    #[serde(default)]
    pub scale_cpu_limit: Option<String>,

    #[serde(default)]
    pub scale_memory_limit: Option<String>,

    #[serde(default)]
    pub scale_min_instances: Option<u32>,

    #[serde(default)]
    pub scale_max_instances: Option<u32>,

    /// "ready", "loading", "warning" or "failed".
    #[serde(default)]
    pub status: Option<String>,

    #[serde(default)]
    pub status_details: Option<AppRevisionStatusDetails>,
}

/// Runtime state of an app revision.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppRevisionStatusDetails {
    /// Number of instances currently running.
    #[serde(default)]
    pub actual_instances: Option<u32>,
    #[serde(default)]
    pub reason: Option<String>,
}

impl AppRevision {
    pub fn is_ready(&self) -> bool {
        self.status.as_deref() == Some("ready")
    }
}

/// Address of an app revision.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AppRevisionId {
    pub project_id: String,
    pub app_name: String,
    pub name: String,
}

impl AppRevisionId {
    pub fn new(
        project_id: impl Into<String>,
        app_name: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            app_name: app_name.into(),
            name: name.into(),
        }
    }

    fn path(&self) -> Result<String> {
        require("project_id", &self.project_id)?;
        require("app_name", &self.app_name)?;
        require("name", &self.name)?;
        Ok(resource_path(&[
            "projects",
            &self.project_id,
            "apps",
            &self.app_name,
            "revisions",
            &self.name,
        ]))
    }
}

impl fmt::Display for AppRevisionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.project_id, self.app_name, self.name)
    }
}

/// Query parameters for listing the revisions of an app.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AppRevisionListQuery {
    #[serde(skip)]
    pub project_id: String,
    #[serde(skip)]
    pub app_name: String,
}

impl AppRevisionListQuery {
    pub fn for_app(project_id: impl Into<String>, app_name: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            app_name: app_name.into(),
        }
    }
}

fn app_child_collection(project_id: &str, app_name: &str, collection: &str) -> Result<String> {
    require("project_id", project_id)?;
    require("app_name", app_name)?;
    Ok(resource_path(&["projects", project_id, "apps", app_name, collection]))
}

#[derive(Debug, Deserialize)]
struct AppRevisionListResponse {
    #[serde(default)]
    revisions: Vec<AppRevision>,
    #[serde(default)]
    limit: Option<u32>,
    #[serde(default)]
    next: Option<PageLink>,
}

#[async_trait]
impl Get for AppRevision {
    type Id = AppRevisionId;

    #[tracing::instrument(skip(client))]
    async fn get(client: &CodeEngineClient, id: AppRevisionId) -> Result<Self> {
        let path = id.path()?;
        let response = client
            .get(&path)
            .await
            .map_err(|e| e.or_not_found("AppRevision", id.to_string()))?;
        let revision: AppRevision = response.json().await.map_err(CodeEngineError::HttpError)?;
        Ok(revision)
    }
}

#[async_trait]
impl List for AppRevision {
    type Query = AppRevisionListQuery;

    #[tracing::instrument(skip(client))]
    async fn list_page(
        client: &CodeEngineClient,
        query: &Self::Query,
        start: Option<&str>,
        limit: u32,
    ) -> Result<Page<Self>> {
        let path = app_child_collection(&query.project_id, &query.app_name, "revisions")?;
        let params = PaginationParams::new(start, limit);

        let response = client.get_with_query(&path, &params).await?;
        let data: AppRevisionListResponse =
            response.json().await.map_err(CodeEngineError::HttpError)?;

        Ok(Page::new(data.revisions, data.limit.unwrap_or(limit), data.next.as_ref()))
    }
}

#[async_trait]
impl Delete for AppRevision {
    type Id = AppRevisionId;

    #[tracing::instrument(skip(client))]
    async fn delete(client: &CodeEngineClient, id: AppRevisionId) -> Result<()> {
        let path = id.path()?;
        client
            .delete(&path)
            .await
            .map_err(|e| e.or_not_found("AppRevision", id.to_string()))?;
        Ok(())
    }
}

// =============================================================================
// App instances
// =============================================================================

/// A running container of an app revision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppInstance {
    pub name: String,

    #[serde(default)]
    pub app_name: Option<String>,

    #[serde(default)]
    pub revision_name: Option<String>,

    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub project_id: Option<String>,

    #[serde(default)]
    pub href: Option<String>,

    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,

    /// Always "app_instance_v2".
    #[serde(default)]
    pub resource_type: Option<String>,

    #[serde(default)]
    pub scale_cpu_limit: Option<String>,

    #[serde(default)]
    pub scale_memory_limit: Option<String>,

    #[serde(default)]
    pub scale_ephemeral_storage_limit: Option<String>,

    /// Number of container restarts.
    #[serde(default)]
    pub restarts: Option<u32>,

    /// "pending", "running", "succeeded" or "failed".
    #[serde(default)]
    pub status: Option<String>,

    #[serde(default)]
    pub system_container: Option<ContainerStatus>,

    #[serde(default)]
    pub user_container: Option<ContainerStatus>,
}

/// Current and previous state of a container.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContainerStatus {
    #[serde(default)]
    pub current_state: Option<ContainerStatusDetails>,
    #[serde(default)]
    pub last_observed_state: Option<ContainerStatusDetails>,
}

/// State of a container at one point in time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContainerStatusDetails {
    #[serde(default)]
    pub container_status: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub exit_code: Option<i32>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl AppInstance {
    pub fn is_running(&self) -> bool {
        self.status.as_deref() == Some("running")
    }
}

/// Query parameters for listing the instances of an app.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AppInstanceListQuery {
    #[serde(skip)]
    pub project_id: String,
    #[serde(skip)]
    pub app_name: String,
}

impl AppInstanceListQuery {
    pub fn for_app(project_id: impl Into<String>, app_name: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            app_name: app_name.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct AppInstanceListResponse {
    #[serde(default)]
    instances: Vec<AppInstance>,
    #[serde(default)]
    limit: Option<u32>,
    #[serde(default)]
    next: Option<PageLink>,
}

#[async_trait]
impl List for AppInstance {
    type Query = AppInstanceListQuery;

    #[tracing::instrument(skip(client))]
    async fn list_page(
        client: &CodeEngineClient,
        query: &Self::Query,
        start: Option<&str>,
        limit: u32,
    ) -> Result<Page<Self>> {
        let path = app_child_collection(&query.project_id, &query.app_name, "instances")?;
        let params = PaginationParams::new(start, limit);

        let response = client.get_with_query(&path, &params).await?;
        let data: AppInstanceListResponse =
            response.json().await.map_err(CodeEngineError::HttpError)?;

        Ok(Page::new(data.instances, data.limit.unwrap_or(limit), data.next.as_ref()))
    }
}

// =============================================================================
// Convenience functions
// =============================================================================

/// Get a single app.
pub async fn get_app(client: &CodeEngineClient, project_id: &str, name: &str) -> Result<App> {
    App::get(client, ResourceId::new(project_id, name)).await
}

/// Fetch all apps of a project.
pub async fn list_apps(client: &CodeEngineClient, project_id: &str) -> Result<Vec<App>> {
    App::list_all(client, &AppListQuery::for_project(project_id)).await
}

/// Request deletion of an app.
pub async fn delete_app(client: &CodeEngineClient, project_id: &str, name: &str) -> Result<()> {
    App::delete(client, ResourceId::new(project_id, name)).await
}

/// Fetch all revisions of an app.
pub async fn list_app_revisions(
    client: &CodeEngineClient,
    project_id: &str,
    app_name: &str,
) -> Result<Vec<AppRevision>> {
    AppRevision::list_all(client, &AppRevisionListQuery::for_app(project_id, app_name)).await
}

/// Get a single app revision.
pub async fn get_app_revision(
    client: &CodeEngineClient,
    project_id: &str,
    app_name: &str,
    name: &str,
) -> Result<AppRevision> {
    AppRevision::get(client, AppRevisionId::new(project_id, app_name, name)).await
}

/// Request deletion of an app revision.
pub async fn delete_app_revision(
    client: &CodeEngineClient,
    project_id: &str,
    app_name: &str,
    name: &str,
) -> Result<()> {
    AppRevision::delete(client, AppRevisionId::new(project_id, app_name, name)).await
}

/// Fetch all instances of an app.
pub async fn list_app_instances(
    client: &CodeEngineClient,
    project_id: &str,
    app_name: &str,
) -> Result<Vec<AppInstance>> {
    AppInstance::list_all(client, &AppInstanceListQuery::for_app(project_id, app_name)).await
}
