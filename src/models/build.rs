//! Build and build run models and trait implementations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

use crate::client::CodeEngineClient;
use crate::error::{require, CodeEngineError, Result};
use crate::models::common::{collection_path, ResourceId};
use crate::pagination::{FilteredPageParams, Page, PageLink, PaginationParams};
use crate::traits::{Create, Delete, Get, List, Update};

/// A container image build definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Build {
    pub name: String,

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

    /// Always "build_v2".
    #[serde(default)]
    pub resource_type: Option<String>,

    #[serde(default)]
    pub entity_tag: String,

    /// Image the build pushes (e.g., "private.de.icr.io/icr_namespace/image-name").
    pub output_image: String,

    /// Registry secret used to push the image.
    pub output_secret: String,

    /// "git" or "local".
    #[serde(default)]
    pub source_type: Option<String>,

    #[serde(default)]
    pub source_url: Option<String>,

    /// Branch, tag or commit.
    #[serde(default)]
    pub source_revision: Option<String>,

    /// Directory inside the repository that holds the sources.
    #[serde(default)]
    pub source_context_dir: Option<String>,

    #[serde(default)]
    pub source_secret: Option<String>,

    /// "dockerfile" or "buildpacks".
    pub strategy_type: String,

    /// "small", "medium", "large", "xlarge" or "xxlarge".
    #[serde(default)]
    pub strategy_size: Option<String>,

    /// Path of the Dockerfile for the dockerfile strategy.
    #[serde(default)]
    pub strategy_spec_file: Option<String>,

    /// Build timeout in seconds.
    #[serde(default)]
    pub timeout: Option<u32>,

    /// "ready" or "failed".
    #[serde(default)]
    pub status: Option<String>,

    #[serde(default)]
    pub status_details: Option<BuildStatusDetails>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildStatusDetails {
    #[serde(default)]
    pub reason: Option<String>,
}

impl Build {
    /// Entity tag to pass as `If-Match` when updating.
    pub fn entity_tag(&self) -> &str {
        &self.entity_tag
    }

    pub fn is_ready(&self) -> bool {
        self.status.as_deref() == Some("ready")
    }

    /// Get all runs of this build.
    pub async fn runs(&self, client: &CodeEngineClient) -> Result<Vec<BuildRun>> {
        let project_id = self.project_id.as_deref().unwrap_or_default();
        list_build_runs(client, project_id, Some(self.name.as_str())).await
    }
}

/// Query parameters for listing builds.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BuildListQuery {
    #[serde(skip)]
    pub project_id: String,
}

impl BuildListQuery {
    pub fn for_project(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
        }
    }
}

/// Parameters for creating a build.
#[skip_serializing_none]
#[derive(Debug, Clone, Default, Serialize)]
pub struct BuildCreateParams {
    #[serde(skip)]
    pub project_id: String,
    pub name: String,
    pub output_image: String,
    pub output_secret: String,
    pub strategy_type: String,
    pub source_type: Option<String>,
    pub source_url: Option<String>,
    pub source_revision: Option<String>,
    pub source_context_dir: Option<String>,
    pub source_secret: Option<String>,
    pub strategy_size: Option<String>,
    pub strategy_spec_file: Option<String>,
    pub timeout: Option<u32>,
}

impl BuildCreateParams {
    pub fn new(
        project_id: impl Into<String>,
        name: impl Into<String>,
        output_image: impl Into<String>,
        output_secret: impl Into<String>,
        strategy_type: impl Into<String>,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            name: name.into(),
            output_image: output_image.into(),
            output_secret: output_secret.into(),
            strategy_type: strategy_type.into(),
            ..Default::default()
        }
    }

    /// Build from a git repository.
    pub fn with_git_source(mut self, url: impl Into<String>) -> Self {
        self.source_type = Some("git".to_string());
        self.source_url = Some(url.into());
        self
    }
}

/// Merge-patch parameters for updating a build.
#[skip_serializing_none]
#[derive(Debug, Clone, Default, Serialize)]
pub struct BuildUpdateParams {
    pub output_image: Option<String>,
    pub output_secret: Option<String>,
    pub source_type: Option<String>,
    pub source_url: Option<String>,
    pub source_revision: Option<String>,
    pub source_context_dir: Option<String>,
    pub source_secret: Option<String>,
    pub strategy_type: Option<String>,
    pub strategy_size: Option<String>,
    pub strategy_spec_file: Option<String>,
    pub timeout: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct BuildListResponse {
    #[serde(default)]
    builds: Vec<Build>,
    #[serde(default)]
    limit: Option<u32>,
    #[serde(default)]
    next: Option<PageLink>,
}

#[async_trait]
impl Get for Build {
    type Id = ResourceId;

    #[tracing::instrument(skip(client))]
    async fn get(client: &CodeEngineClient, id: ResourceId) -> Result<Self> {
        let path = id.path("builds")?;
        let response = client
            .get(&path)
            .await
            .map_err(|e| e.or_not_found("Build", id.to_string()))?;
        let build: Build = response.json().await.map_err(CodeEngineError::HttpError)?;
        Ok(build)
    }
}

#[async_trait]
impl List for Build {
    type Query = BuildListQuery;

    #[tracing::instrument(skip(client))]
    async fn list_page(
        client: &CodeEngineClient,
        query: &Self::Query,
        start: Option<&str>,
        limit: u32,
    ) -> Result<Page<Self>> {
        let path = collection_path(&query.project_id, "builds")?;
        let params = PaginationParams::new(start, limit);

        let response = client.get_with_query(&path, &params).await?;
        let data: BuildListResponse = response.json().await.map_err(CodeEngineError::HttpError)?;

        Ok(Page::new(data.builds, data.limit.unwrap_or(limit), data.next.as_ref()))
    }
}

#[async_trait]
impl Create for Build {
    type Params = BuildCreateParams;

    #[tracing::instrument(skip(client))]
    async fn create(client: &CodeEngineClient, params: Self::Params) -> Result<Self> {
        let path = collection_path(&params.project_id, "builds")?;
        require("name", &params.name)?;
        require("output_image", &params.output_image)?;
        require("output_secret", &params.output_secret)?;
        require("strategy_type", &params.strategy_type)?;

        let response = client.post(&path, &params).await?;
        let build: Build = response.json().await.map_err(CodeEngineError::HttpError)?;
        Ok(build)
    }
}

#[async_trait]
impl Update for Build {
    type Id = ResourceId;
    type Params = BuildUpdateParams;

    #[tracing::instrument(skip(client))]
    async fn update(
        client: &CodeEngineClient,
        id: ResourceId,
        if_match: &str,
        params: Self::Params,
    ) -> Result<Self> {
        let path = id.path("builds")?;
        require("if_match", if_match)?;

        let response = client
            .patch(&path, if_match, &params)
            .await
            .map_err(|e| e.or_not_found("Build", id.to_string()))?;
        let build: Build = response.json().await.map_err(CodeEngineError::HttpError)?;
        Ok(build)
    }
}

#[async_trait]
impl Delete for Build {
    type Id = ResourceId;

    #[tracing::instrument(skip(client))]
    async fn delete(client: &CodeEngineClient, id: ResourceId) -> Result<()> {
        let path = id.path("builds")?;
        client
            .delete(&path)
            .await
            .map_err(|e| e.or_not_found("Build", id.to_string()))?;
        Ok(())
    }
}

// =============================================================================
// Build runs
// =============================================================================

/// One execution of a build.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildRun {
    pub name: String,

    #[serde(default)]
    pub build_name: Option<String>,

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

    /// Always "build_run_v2".
    #[serde(default)]
    pub resource_type: Option<String>,

    #[serde(default)]
    pub output_image: Option<String>,

    #[serde(default)]
    pub output_secret: Option<String>,

    #[serde(default)]
    pub source_type: Option<String>,

    #[serde(default)]
    pub source_url: Option<String>,

    #[serde(default)]
    pub source_revision: Option<String>,

    #[serde(default)]
    pub strategy_type: Option<String>,

    #[serde(default)]
    pub strategy_size: Option<String>,

    #[serde(default)]
    pub timeout: Option<u32>,

    #[serde(default)]
    pub service_account: Option<String>,

    /// "pending", "running", "succeeded" or "failed".
    #[serde(default)]
    pub status: Option<String>,

    #[serde(default)]
    pub status_details: Option<BuildRunStatusDetails>,
}

/// Outcome and timing of a build run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildRunStatusDetails {
    #[serde(default)]
    pub reason: Option<String>,
    /// Digest of the pushed image.
    #[serde(default)]
    pub output_digest: Option<String>,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completion_time: Option<DateTime<Utc>>,
}

impl BuildRun {
    pub fn is_finished(&self) -> bool {
        matches!(self.status.as_deref(), Some("succeeded") | Some("failed"))
    }

    pub fn is_succeeded(&self) -> bool {
        self.status.as_deref() == Some("succeeded")
    }
}

/// Query parameters for listing build runs.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BuildRunListQuery {
    #[serde(skip)]
    pub project_id: String,
    /// Only list runs of this build.
    pub build_name: Option<String>,
}

impl BuildRunListQuery {
    pub fn for_project(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            build_name: None,
        }
    }

    pub fn with_build_name(mut self, build_name: impl Into<String>) -> Self {
        self.build_name = Some(build_name.into());
        self
    }
}

/// Parameters for submitting a build run.
///
/// Either `build_name` or the full output/strategy settings must be set.
#[skip_serializing_none]
#[derive(Debug, Clone, Default, Serialize)]
pub struct BuildRunCreateParams {
    #[serde(skip)]
    pub project_id: String,
    pub build_name: Option<String>,
    /// Run name; generated by the server when omitted.
    pub name: Option<String>,
    pub output_image: Option<String>,
    pub output_secret: Option<String>,
    pub service_account: Option<String>,
    pub source_type: Option<String>,
    pub source_url: Option<String>,
    pub source_revision: Option<String>,
    pub source_context_dir: Option<String>,
    pub source_secret: Option<String>,
    pub strategy_type: Option<String>,
    pub strategy_size: Option<String>,
    pub strategy_spec_file: Option<String>,
    pub timeout: Option<u32>,
}

impl BuildRunCreateParams {
    /// Run an existing build unchanged.
    pub fn for_build(project_id: impl Into<String>, build_name: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            build_name: Some(build_name.into()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Deserialize)]
struct BuildRunListResponse {
    #[serde(default)]
    build_runs: Vec<BuildRun>,
    #[serde(default)]
    limit: Option<u32>,
    #[serde(default)]
    next: Option<PageLink>,
}

#[async_trait]
impl Get for BuildRun {
    type Id = ResourceId;

    #[tracing::instrument(skip(client))]
    async fn get(client: &CodeEngineClient, id: ResourceId) -> Result<Self> {
        let path = id.path("build_runs")?;
        let response = client
            .get(&path)
            .await
            .map_err(|e| e.or_not_found("BuildRun", id.to_string()))?;
        let run: BuildRun = response.json().await.map_err(CodeEngineError::HttpError)?;
        Ok(run)
    }
}

#[async_trait]
impl List for BuildRun {
    type Query = BuildRunListQuery;

    #[tracing::instrument(skip(client))]
    async fn list_page(
        client: &CodeEngineClient,
        query: &Self::Query,
        start: Option<&str>,
        limit: u32,
    ) -> Result<Page<Self>> {
        let path = collection_path(&query.project_id, "build_runs")?;
        let params =
            FilteredPageParams::new(start, limit, "build_name", query.build_name.as_deref());

        let response = client.get_with_query(&path, &params.pairs()).await?;
        let data: BuildRunListResponse =
            response.json().await.map_err(CodeEngineError::HttpError)?;

        Ok(Page::new(data.build_runs, data.limit.unwrap_or(limit), data.next.as_ref()))
    }
}

#[async_trait]
impl Create for BuildRun {
    type Params = BuildRunCreateParams;

    #[tracing::instrument(skip(client))]
    async fn create(client: &CodeEngineClient, params: Self::Params) -> Result<Self> {
        let path = collection_path(&params.project_id, "build_runs")?;
        if params.build_name.as_deref().unwrap_or_default().is_empty()
            && params.output_image.as_deref().unwrap_or_default().is_empty()
        {
            return Err(CodeEngineError::InvalidArgument(
                "build_name or output_image must be set".to_string(),
            ));
        }

        let response = client.post(&path, &params).await?;
        let run: BuildRun = response.json().await.map_err(CodeEngineError::HttpError)?;
        Ok(run)
    }
}

#[async_trait]
impl Delete for BuildRun {
    type Id = ResourceId;

    #[tracing::instrument(skip(client))]
    async fn delete(client: &CodeEngineClient, id: ResourceId) -> Result<()> {
        let path = id.path("build_runs")?;
        client
            .delete(&path)
            .await
            .map_err(|e| e.or_not_found("BuildRun", id.to_string()))?;
        Ok(())
    }
}

// Convenience functions

/// Get a single build.
pub async fn get_build(client: &CodeEngineClient, project_id: &str, name: &str) -> Result<Build> {
    Build::get(client, ResourceId::new(project_id, name)).await
}

/// Fetch all builds of a project.
pub async fn list_builds(client: &CodeEngineClient, project_id: &str) -> Result<Vec<Build>> {
    Build::list_all(client, &BuildListQuery::for_project(project_id)).await
}

/// Request deletion of a build and its runs.
pub async fn delete_build(client: &CodeEngineClient, project_id: &str, name: &str) -> Result<()> {
    Build::delete(client, ResourceId::new(project_id, name)).await
}

/// Fetch all build runs of a project, optionally only those of one build.
pub async fn list_build_runs(
    client: &CodeEngineClient,
    project_id: &str,
    build_name: Option<&str>,
) -> Result<Vec<BuildRun>> {
    let mut query = BuildRunListQuery::for_project(project_id);
    query.build_name = build_name.map(str::to_string);
    BuildRun::list_all(client, &query).await
}

/// Get a single build run.
pub async fn get_build_run(
    client: &CodeEngineClient,
    project_id: &str,
    name: &str,
) -> Result<BuildRun> {
    BuildRun::get(client, ResourceId::new(project_id, name)).await
}

/// Request deletion of a build run.
pub async fn delete_build_run(
    client: &CodeEngineClient,
    project_id: &str,
    name: &str,
) -> Result<()> {
    BuildRun::delete(client, ResourceId::new(project_id, name)).await
}

/// Submit a run of an existing build.
pub async fn submit_build_run(
    client: &CodeEngineClient,
    project_id: &str,
    build_name: &str,
) -> Result<BuildRun> {
    require("build_name", build_name)?;
    BuildRun::create(client, BuildRunCreateParams::for_build(project_id, build_name)).await
}
