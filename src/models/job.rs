//! Job and job run models and trait implementations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

use crate::client::CodeEngineClient;
use crate::error::{require, CodeEngineError, Result};
use crate::models::common::{collection_path, EnvVar, ResourceId, VolumeMount};
use crate::pagination::{FilteredPageParams, Page, PageLink, PaginationParams};
use crate::traits::{Create, Delete, Get, List, Update};

/// A Code Engine job: a run-to-completion workload definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
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

    /// Always "job_v2".
    #[serde(default)]
    pub resource_type: Option<String>,

    /// Version tag required by `If-Match` on updates.
    #[serde(default)]
    pub entity_tag: String,

    pub image_reference: String,

    #[serde(default)]
    pub image_secret: Option<String>,

    #[serde(default)]
    pub run_arguments: Vec<String>,

    #[serde(default)]
    pub run_as_user: Option<u32>,

    #[serde(default)]
    pub run_commands: Vec<String>,

    #[serde(default)]
    pub run_env_variables: Vec<EnvVar>,

    #[serde(default)]
    pub computed_env_variables: Vec<EnvVar>,

    /// "task" (runs to completion) or "daemon" (runs indefinitely).
    #[serde(default)]
    pub run_mode: Option<String>,

    #[serde(default)]
    pub run_service_account: Option<String>,

    #[serde(default)]
    pub run_volume_mounts: Vec<VolumeMount>,

    /// Array indices to run (e.g., "0-9" or "1,3,5").
    #[serde(default)]
    pub scale_array_spec: Option<String>,

    #[serde(default)]
    pub scale_cpu_limit: Option<String>,

    #[serde(default)]
    pub scale_ephemeral_storage_limit: Option<String>,

    /// Maximum run time per instance in seconds.
    #[serde(default)]
    pub scale_max_execution_time: Option<u32>,

    #[serde(default)]
    pub scale_memory_limit: Option<String>,

    /// Retries per failed array index.
    #[serde(default)]
    pub scale_retry_limit: Option<u32>,

    #[serde(default)]
    pub build: Option<String>,

    #[serde(default)]
    pub build_run: Option<String>,
}

impl Job {
    /// Entity tag to pass as `If-Match` when updating.
    pub fn entity_tag(&self) -> &str {
        &self.entity_tag
    }

    /// Whether the job runs indefinitely instead of to completion.
    pub fn is_daemon(&self) -> bool {
        self.run_mode.as_deref() == Some("daemon")
    }

    /// Get all runs of this job.
    pub async fn runs(&self, client: &CodeEngineClient) -> Result<Vec<JobRun>> {
        let project_id = self.project_id.as_deref().unwrap_or_default();
        list_job_runs(client, project_id, Some(self.name.as_str())).await
    }

    /// Start a run of this job with its current configuration.
    pub async fn submit(&self, client: &CodeEngineClient) -> Result<JobRun> {
        let project_id = self.project_id.as_deref().unwrap_or_default();
        submit_job_run(client, project_id, &self.name).await
    }
}

/// Query parameters for listing jobs.
#[derive(Debug, Clone, Default, Serialize)]
pub struct JobListQuery {
    #[serde(skip)]
    pub project_id: String,
}

impl JobListQuery {
    pub fn for_project(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
        }
    }
}

/// Parameters for creating a job.
#[skip_serializing_none]
#[derive(Debug, Clone, Default, Serialize)]
pub struct JobCreateParams {
    #[serde(skip)]
    pub project_id: String,
    pub name: String,
    pub image_reference: String,
    pub image_secret: Option<String>,
    pub run_arguments: Option<Vec<String>>,
    pub run_as_user: Option<u32>,
    pub run_commands: Option<Vec<String>>,
    pub run_env_variables: Option<Vec<EnvVar>>,
    pub run_mode: Option<String>,
    pub run_service_account: Option<String>,
    pub run_volume_mounts: Option<Vec<VolumeMount>>,
    pub scale_array_spec: Option<String>,
    pub scale_cpu_limit: Option<String>,
    pub scale_ephemeral_storage_limit: Option<String>,
    pub scale_max_execution_time: Option<u32>,
    pub scale_memory_limit: Option<String>,
    pub scale_retry_limit: Option<u32>,
}

impl JobCreateParams {
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

/// Merge-patch parameters for updating a job.
#[skip_serializing_none]
#[derive(Debug, Clone, Default, Serialize)]
pub struct JobUpdateParams {
    pub image_reference: Option<String>,
    pub image_secret: Option<String>,
    pub run_arguments: Option<Vec<String>>,
    pub run_as_user: Option<u32>,
    pub run_commands: Option<Vec<String>>,
    pub run_env_variables: Option<Vec<EnvVar>>,
    pub run_mode: Option<String>,
    pub run_service_account: Option<String>,
    pub run_volume_mounts: Option<Vec<VolumeMount>>,
    pub scale_array_spec: Option<String>,
    pub scale_cpu_limit: Option<String>,
    pub scale_ephemeral_storage_limit: Option<String>,
    pub scale_max_execution_time: Option<u32>,
    pub scale_memory_limit: Option<String>,
    pub scale_retry_limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct JobListResponse {
    #[serde(default)]
    jobs: Vec<Job>,
    #[serde(default)]
    limit: Option<u32>,
    #[serde(default)]
    next: Option<PageLink>,
}

#[async_trait]
impl Get for Job {
    type Id = ResourceId;

    #[tracing::instrument(skip(client))]
    async fn get(client: &CodeEngineClient, id: ResourceId) -> Result<Self> {
        let path = id.path("jobs")?;
        let response = client
            .get(&path)
            .await
            .map_err(|e| e.or_not_found("Job", id.to_string()))?;
        let job: Job = response.json().await.map_err(CodeEngineError::HttpError)?;
        Ok(job)
    }
}

#[async_trait]
impl List for Job {
    type Query = JobListQuery;

    #[tracing::instrument(skip(client))]
    async fn list_page(
        client: &CodeEngineClient,
        query: &Self::Query,
        start: Option<&str>,
        limit: u32,
    ) -> Result<Page<Self>> {
        let path = collection_path(&query.project_id, "jobs")?;
        let params = PaginationParams::new(start, limit);

        let response = client.get_with_query(&path, &params).await?;
        let data: JobListResponse = response.json().await.map_err(CodeEngineError::HttpError)?;

        Ok(Page::new(data.jobs, data.limit.unwrap_or(limit), data.next.as_ref()))
    }
}

#[async_trait]
impl Create for Job {
    type Params = JobCreateParams;

    #[tracing::instrument(skip(client))]
    async fn create(client: &CodeEngineClient, params: Self::Params) -> Result<Self> {
        let path = collection_path(&params.project_id, "jobs")?;
        require("name", &params.name)?;
        require("image_reference", &params.image_reference)?;

        let response = client.post(&path, &params).await?;
        let job: Job = response.json().await.map_err(CodeEngineError::HttpError)?;
        Ok(job)
    }
}

#[async_trait]
impl Update for Job {
    type Id = ResourceId;
    type Params = JobUpdateParams;

    #[tracing::instrument(skip(client))]
    async fn update(
        client: &CodeEngineClient,
        id: ResourceId,
        if_match: &str,
        params: Self::Params,
    ) -> Result<Self> {
        let path = id.path("jobs")?;
        require("if_match", if_match)?;

        let response = client
            .patch(&path, if_match, &params)
            .await
            .map_err(|e| e.or_not_found("Job", id.to_string()))?;
        let job: Job = response.json().await.map_err(CodeEngineError::HttpError)?;
        Ok(job)
    }
}

#[async_trait]
impl Delete for Job {
    type Id = ResourceId;

    #[tracing::instrument(skip(client))]
    async fn delete(client: &CodeEngineClient, id: ResourceId) -> Result<()> {
        let path = id.path("jobs")?;
        client
            .delete(&path)
            .await
            .map_err(|e| e.or_not_found("Job", id.to_string()))?;
        Ok(())
    }
}

// =============================================================================
// Job runs
// =============================================================================

/// One execution of a job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRun {
    pub name: String,

    /// Job this run was submitted from; absent for standalone runs.
    #[serde(default)]
    pub job_name: Option<String>,

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

    /// Always "job_run_v2".
    #[serde(default)]
    pub resource_type: Option<String>,

    #[serde(default)]
    pub image_reference: Option<String>,

    #[serde(default)]
    pub run_arguments: Vec<String>,

    #[serde(default)]
    pub run_commands: Vec<String>,

    #[serde(default)]
    pub run_env_variables: Vec<EnvVar>,

    #[serde(default)]
    pub run_mode: Option<String>,

    #[serde(default)]
    pub scale_array_spec: Option<String>,

    #[serde(default)]
    pub scale_cpu_limit: Option<String>,

    #[serde(default)]
    pub scale_memory_limit: Option<String>,

    #[serde(default)]
    pub scale_max_execution_time: Option<u32>,

    #[serde(default)]
    pub scale_retry_limit: Option<u32>,

    /// "pending", "running", "completed" or "failed".
    #[serde(default)]
    pub status: Option<String>,

    #[serde(default)]
    pub status_details: Option<JobRunStatusDetails>,
}

/// Per-index counters and timing of a job run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobRunStatusDetails {
    #[serde(default)]
    pub requested: Option<u32>,
    #[serde(default)]
    pub pending: Option<u32>,
    #[serde(default)]
    pub running: Option<u32>,
    #[serde(default)]
    pub succeeded: Option<u32>,
    #[serde(default)]
    pub failed: Option<u32>,
    #[serde(default)]
    pub unknown: Option<u32>,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completion_time: Option<DateTime<Utc>>,
}

impl JobRun {
    /// Whether the run has finished, successfully or not.
    pub fn is_finished(&self) -> bool {
        matches!(self.status.as_deref(), Some("completed") | Some("failed"))
    }

    pub fn is_failed(&self) -> bool {
        self.status.as_deref() == Some("failed")
    }
}

/// Query parameters for listing job runs.
#[derive(Debug, Clone, Default, Serialize)]
pub struct JobRunListQuery {
    #[serde(skip)]
    pub project_id: String,
    /// Only list runs of this job.
    pub job_name: Option<String>,
}

impl JobRunListQuery {
    pub fn for_project(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            job_name: None,
        }
    }

    pub fn with_job_name(mut self, job_name: impl Into<String>) -> Self {
        self.job_name = Some(job_name.into());
        self
    }
}

/// Parameters for submitting a job run.
///
/// Either `job_name` or `image_reference` must be set; the remaining fields
/// override the job's configuration for this run only.
#[skip_serializing_none]
#[derive(Debug, Clone, Default, Serialize)]
pub struct JobRunCreateParams {
    #[serde(skip)]
    pub project_id: String,
    pub job_name: Option<String>,
    /// Run name; generated by the server when omitted.
    pub name: Option<String>,
    pub image_reference: Option<String>,
    pub image_secret: Option<String>,
    pub run_arguments: Option<Vec<String>>,
    pub run_as_user: Option<u32>,
    pub run_commands: Option<Vec<String>>,
    pub run_env_variables: Option<Vec<EnvVar>>,
    pub run_mode: Option<String>,
    pub run_service_account: Option<String>,
    pub run_volume_mounts: Option<Vec<VolumeMount>>,
    pub scale_array_spec: Option<String>,
    pub scale_cpu_limit: Option<String>,
    pub scale_ephemeral_storage_limit: Option<String>,
    pub scale_max_execution_time: Option<u32>,
    pub scale_memory_limit: Option<String>,
    pub scale_retry_limit: Option<u32>,
}

impl JobRunCreateParams {
    /// Run an existing job unchanged.
    pub fn for_job(project_id: impl Into<String>, job_name: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            job_name: Some(job_name.into()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Deserialize)]
struct JobRunListResponse {
    #[serde(default)]
    job_runs: Vec<JobRun>,
    #[serde(default)]
    limit: Option<u32>,
    #[serde(default)]
    next: Option<PageLink>,
}

#[async_trait]
impl Get for JobRun {
    type Id = ResourceId;

    #[tracing::instrument(skip(client))]
    async fn get(client: &CodeEngineClient, id: ResourceId) -> Result<Self> {
        let path = id.path("job_runs")?;
        let response = client
            .get(&path)
            .await
            .map_err(|e| e.or_not_found("JobRun", id.to_string()))?;
        let run: JobRun = response.json().await.map_err(CodeEngineError::HttpError)?;
        Ok(run)
    }
}

#[async_trait]
impl List for JobRun {
    type Query = JobRunListQuery;

    #[tracing::instrument(skip(client))]
    async fn list_page(
        client: &CodeEngineClient,
        query: &Self::Query,
        start: Option<&str>,
        limit: u32,
    ) -> Result<Page<Self>> {
        let path = collection_path(&query.project_id, "job_runs")?;
        let params = FilteredPageParams::new(start, limit, "job_name", query.job_name.as_deref());

        let response = client.get_with_query(&path, &params.pairs()).await?;
        let data: JobRunListResponse = response.json().await.map_err(CodeEngineError::HttpError)?;

        Ok(Page::new(data.job_runs, data.limit.unwrap_or(limit), data.next.as_ref()))
    }
}

#[async_trait]
impl Create for JobRun {
    type Params = JobRunCreateParams;

    #[tracing::instrument(skip(client))]
    async fn create(client: &CodeEngineClient, params: Self::Params) -> Result<Self> {
        let path = collection_path(&params.project_id, "job_runs")?;
        if params.job_name.as_deref().unwrap_or_default().is_empty()
            && params.image_reference.as_deref().unwrap_or_default().is_empty()
        {
            return Err(CodeEngineError::InvalidArgument(
                "job_name or image_reference must be set".to_string(),
            ));
        }

        let response = client.post(&path, &params).await?;
        let run: JobRun = response.json().await.map_err(CodeEngineError::HttpError)?;
        Ok(run)
    }
}

#[async_trait]
impl Delete for JobRun {
    type Id = ResourceId;

    #[tracing::instrument(skip(client))]
    async fn delete(client: &CodeEngineClient, id: ResourceId) -> Result<()> {
        let path = id.path("job_runs")?;
        client
            .delete(&path)
            .await
            .map_err(|e| e.or_not_found("JobRun", id.to_string()))?;
        Ok(())
    }
}

// =============================================================================
// Convenience functions
// =============================================================================

/// Get a single job.
pub async fn get_job(client: &CodeEngineClient, project_id: &str, name: &str) -> Result<Job> {
    Job::get(client, ResourceId::new(project_id, name)).await
}

/// Fetch all jobs of a project.
pub async fn list_jobs(client: &CodeEngineClient, project_id: &str) -> Result<Vec<Job>> {
    Job::list_all(client, &JobListQuery::for_project(project_id)).await
}

/// Request deletion of a job.
pub async fn delete_job(client: &CodeEngineClient, project_id: &str, name: &str) -> Result<()> {
    Job::delete(client, ResourceId::new(project_id, name)).await
}

/// Fetch all job runs of a project, optionally only those of one job.
pub async fn list_job_runs(
    client: &CodeEngineClient,
    project_id: &str,
    job_name: Option<&str>,
) -> Result<Vec<JobRun>> {
    let mut query = JobRunListQuery::for_project(project_id);
    query.job_name = job_name.map(str::to_string);
    JobRun::list_all(client, &query).await
}

/// Get a single job run.
pub async fn get_job_run(
    client: &CodeEngineClient,
    project_id: &str,
    name: &str,
) -> Result<JobRun> {
    JobRun::get(client, ResourceId::new(project_id, name)).await
}

/// Request deletion of a job run.
pub async fn delete_job_run(
    client: &CodeEngineClient,
    project_id: &str,
    name: &str,
) -> Result<()> {
    JobRun::delete(client, ResourceId::new(project_id, name)).await
}

/// Submit a run of an existing job.
pub async fn submit_job_run(
    client: &CodeEngineClient,
    project_id: &str,
    job_name: &str,
) -> Result<JobRun> {
    require("job_name", job_name)?;
    JobRun::create(client, JobRunCreateParams::for_job(project_id, job_name)).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_deserialize() {
        let json = r#"{
            "created_at": "2022-09-13T11:41:35+02:00",
            "entity_tag": "2385407409",
            "id": "e33b1cv7-7390-4437-a5c2-130d5ccdddc3",
            "image_reference": "icr.io/codeengine/helloworld",
            "name": "my-job",
            "project_id": "230828b4-4f15-40a9-b183-1268c6ab88d5",
            "resource_type": "job_v2",
            "run_mode": "task",
            "scale_array_spec": "0",
            "scale_cpu_limit": "1",
            "scale_max_execution_time": 7200,
            "scale_memory_limit": "4G",
            "scale_retry_limit": 3
        }"#;

        let job: Job = serde_json::from_str(json).expect("Failed to deserialize job");
        assert_eq!(job.name, "my-job");
        assert_eq!(job.entity_tag(), "2385407409");
        assert!(!job.is_daemon());
        assert_eq!(job.scale_retry_limit, Some(3));
        assert!(job.run_env_variables.is_empty());
    }

    #[test]
    fn test_job_run_deserialize() {
        let json = r#"{
            "job_name": "my-job",
            "name": "my-job-run-1",
            "resource_type": "job_run_v2",
            "status": "completed",
            "status_details": {
                "completion_time": "2022-09-22T17:40:00Z",
                "requested": 1,
                "succeeded": 1,
                "failed": 0,
                "start_time": "2022-09-22T17:34:00Z"
            }
        }"#;
        let run: JobRun = serde_json::from_str(json).unwrap();
        assert!(run.is_finished());
        assert!(!run.is_failed());
        let details = run.status_details.unwrap();
        assert_eq!(details.succeeded, Some(1));
        assert!(details.completion_time.is_some());
    }

    #[test]
    fn test_job_run_params_for_job() {
        let json = serde_json::to_value(JobRunCreateParams::for_job("p", "my-job")).unwrap();
        assert_eq!(json, serde_json::json!({"job_name": "my-job"}));
    }
}
