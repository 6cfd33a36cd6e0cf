//! Project model and trait implementations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

use crate::client::{resource_path, CodeEngineClient};
use crate::error::{require, CodeEngineError, Result};
use crate::pagination::{Page, PageLink, PaginationParams};
use crate::traits::{Create, Delete, Get, List};

/// A Code Engine project.
///
/// Projects are the top-level containers that group apps, jobs, builds,
/// config maps and secrets. They are addressed by ID; every other resource
/// is addressed by project ID plus name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    /// Project ID (a GUID).
    pub id: String,

    /// Project name.
    pub name: String,

    /// Region the project lives in (e.g., "us-south").
    #[serde(default)]
    pub region: Option<String>,

    /// Owning account.
    #[serde(default)]
    pub account_id: Option<String>,

    /// Resource group the project is billed to.
    #[serde(default)]
    pub resource_group_id: Option<String>,

    /// Cloud resource name.
    #[serde(default)]
    pub crn: Option<String>,

    /// Canonical URL of this project.
    #[serde(default)]
    pub href: Option<String>,

    /// When the project was created.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,

    /// Lifecycle status (e.g., "active", "inactive", "pending_removal", "hard_deleting").
    #[serde(default)]
    pub status: Option<String>,

    /// Always "project_v2".
    #[serde(default)]
    pub resource_type: Option<String>,
}

impl Project {
    /// Whether the project is ready to host workloads.
    pub fn is_active(&self) -> bool {
        self.status.as_deref() == Some("active")
    }

    /// Whether the project has been soft-deleted.
    pub fn is_pending_removal(&self) -> bool {
        self.status.as_deref() == Some("pending_removal")
    }

    /// Get all apps in this project.
    pub async fn apps(&self, client: &CodeEngineClient) -> Result<Vec<crate::models::app::App>> {
        crate::models::app::list_apps(client, &self.id).await
    }

    /// Get all jobs in this project.
    pub async fn jobs(&self, client: &CodeEngineClient) -> Result<Vec<crate::models::job::Job>> {
        crate::models::job::list_jobs(client, &self.id).await
    }

    /// Get the project's egress IP addresses.
    pub async fn egress_ips(&self, client: &CodeEngineClient) -> Result<ProjectEgressIpAddresses> {
        get_project_egress_ips(client, &self.id).await
    }

    /// Get the project's component status.
    pub async fn status_details(&self, client: &CodeEngineClient) -> Result<ProjectStatusDetails> {
        get_project_status_details(client, &self.id).await
    }
}

/// Component status of a project.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectStatusDetails {
    /// Status of the project's domain ("ready", "unknown").
    #[serde(default)]
    pub domain: Option<String>,

    /// Status of the project itself ("enabled", "disabled").
    #[serde(default)]
    pub project: Option<String>,

    /// Set when no virtual private endpoint is configured for the project.
    #[serde(default)]
    pub vpe_not_enabled: Option<bool>,
}

/// IP addresses used by a project's workloads for outbound traffic.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectEgressIpAddresses {
    #[serde(default)]
    pub private: Vec<String>,
    #[serde(default)]
    pub public: Vec<String>,
}

/// Query parameters for listing projects.
///
/// Projects are listed account-wide; there are no filters.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProjectListQuery {}

/// Parameters for creating a project.
#[skip_serializing_none]
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProjectCreateParams {
    /// Project name.
    pub name: String,

    /// Resource group; the account's default group when omitted.
    pub resource_group_id: Option<String>,

    /// Tags attached to the project.
    pub tags: Option<Vec<String>>,
}

impl ProjectCreateParams {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// API response wrapper for listing projects.
#[derive(Debug, Deserialize)]
struct ProjectListResponse {
    #[serde(default)]
    projects: Vec<Project>,
    #[serde(default)]
    limit: Option<u32>,
    #[serde(default)]
    next: Option<PageLink>,
}

fn project_path(id: &str) -> Result<String> {
    require("project_id", id)?;
    Ok(resource_path(&["projects", id]))
}

#[async_trait]
impl Get for Project {
    type Id = String; // Project ID

    #[tracing::instrument(skip(client))]
    async fn get(client: &CodeEngineClient, id: String) -> Result<Self> {
        let path = project_path(&id)?;
        let response = client
            .get(&path)
            .await
            .map_err(|e| e.or_not_found("Project", id.as_str()))?;
        let project: Project = response.json().await.map_err(CodeEngineError::HttpError)?;
        Ok(project)
    }
}

#[async_trait]
impl List for Project {
    type Query = ProjectListQuery;

    #[tracing::instrument(skip(client))]
    async fn list_page(
        client: &CodeEngineClient,
        _query: &Self::Query,
        start: Option<&str>,
        limit: u32,
    ) -> Result<Page<Self>> {
        let params = PaginationParams::new(start, limit);

        let response = client.get_with_query("projects", &params).await?;
        let data: ProjectListResponse = response.json().await.map_err(CodeEngineError::HttpError)?;

        Ok(Page::new(
            data.projects,
            data.limit.unwrap_or(limit),
            data.next.as_ref(),
        ))
    }
}

#[async_trait]
impl Create for Project {
    type Params = ProjectCreateParams;

    #[tracing::instrument(skip(client))]
    async fn create(client: &CodeEngineClient, params: Self::Params) -> Result<Self> {
        require("name", &params.name)?;
        let response = client.post("projects", &params).await?;
        let project: Project = response.json().await.map_err(CodeEngineError::HttpError)?;
        Ok(project)
    }
}

#[async_trait]
impl Delete for Project {
    type Id = String;

    #[tracing::instrument(skip(client))]
    async fn delete(client: &CodeEngineClient, id: String) -> Result<()> {
        let path = project_path(&id)?;
        client
            .delete(&path)
            .await
            .map_err(|e| e.or_not_found("Project", id.as_str()))?;
        Ok(())
    }
}

// Convenience functions for working with projects

/// Get a single project by ID.
pub async fn get_project(client: &CodeEngineClient, project_id: &str) -> Result<Project> {
    Project::get(client, project_id.to_string()).await
}

/// Fetch all projects visible to the caller.
pub async fn list_projects(client: &CodeEngineClient) -> Result<Vec<Project>> {
    Project::list_all(client, &ProjectListQuery::default()).await
}

/// Create a project with default settings.
pub async fn create_project(client: &CodeEngineClient, name: &str) -> Result<Project> {
    Project::create(client, ProjectCreateParams::new(name)).await
}

/// Request deletion of a project and everything in it.
pub async fn delete_project(client: &CodeEngineClient, project_id: &str) -> Result<()> {
    Project::delete(client, project_id.to_string()).await
}

/// Fetch the egress IP addresses of a project.
#[tracing::instrument(skip(client))]
pub async fn get_project_egress_ips(
    client: &CodeEngineClient,
    project_id: &str,
) -> Result<ProjectEgressIpAddresses> {
    let path = format!("{}/egress_ips", project_path(project_id)?);
    let response = client.get(&path).await?;
    let ips = response.json().await.map_err(CodeEngineError::HttpError)?;
    Ok(ips)
}

/// Fetch the component status of a project.
#[tracing::instrument(skip(client))]
pub async fn get_project_status_details(
    client: &CodeEngineClient,
    project_id: &str,
) -> Result<ProjectStatusDetails> {
    let path = format!("{}/status_details", project_path(project_id)?);
    let response = client.get(&path).await?;
    let details = response.json().await.map_err(CodeEngineError::HttpError)?;
    Ok(details)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_deserialize() {
        let json = r#"{
            "account_id": "4329073d16d2f3663f74bfa955259139",
            "created_at": "2021-03-29T12:18:13.992359829Z",
            "crn": "crn:v1:bluemix:public:codeengine:us-east:a/4329073d16d2f3663f74bfa955259139:4e49b3e0-27a8-48d2-a784-c7ee48bb863b::",
            "href": "https://api.us-east.codeengine.cloud.ibm.com/v2/projects/4e49b3e0-27a8-48d2-a784-c7ee48bb863b",
            "id": "4e49b3e0-27a8-48d2-a784-c7ee48bb863b",
            "name": "project-name",
            "region": "us-east",
            "resource_group_id": "5c49eabcf5e85881a37e2d100a33b3df",
            "resource_type": "project_v2",
            "status": "active"
        }"#;

        let project: Project = serde_json::from_str(json).expect("Failed to deserialize project");
        assert_eq!(project.id, "4e49b3e0-27a8-48d2-a784-c7ee48bb863b");
        assert_eq!(project.name, "project-name");
        assert_eq!(project.region.as_deref(), Some("us-east"));
        assert!(project.is_active());
        assert!(!project.is_pending_removal());
        assert!(project.created_at.is_some());
    }

    #[test]
    fn test_project_minimal() {
        let project: Project =
            serde_json::from_str(r#"{"id": "abc", "name": "p"}"#).expect("Failed to deserialize");
        assert!(project.status.is_none());
        assert!(!project.is_active());
    }

    #[test]
    fn test_create_params_omit_unset() {
        let json = serde_json::to_value(ProjectCreateParams::new("my-project")).unwrap();
        assert_eq!(json, serde_json::json!({"name": "my-project"}));

        let params = ProjectCreateParams {
            name: "p".to_string(),
            resource_group_id: Some("rg".to_string()),
            tags: Some(vec!["env:dev".to_string()]),
        };
        let json = serde_json::to_value(params).unwrap();
        assert_eq!(json["resource_group_id"], "rg");
        assert_eq!(json["tags"][0], "env:dev");
    }

    #[test]
    fn test_list_response_with_next() {
        let data: ProjectListResponse = serde_json::from_str(
            r#"{
                "first": {"href": "https://api.example.com/v2/projects?limit=1"},
                "limit": 1,
                "next": {
                    "href": "https://api.example.com/v2/projects?limit=1&start=MQ",
                    "start": "MQ"
                },
                "projects": [{"id": "a", "name": "alpha"}]
            }"#,
        )
        .unwrap();
        let page = Page::new(data.projects, data.limit.unwrap_or(50), data.next.as_ref());
        assert_eq!(page.len(), 1);
        assert_eq!(page.next_start.as_deref(), Some("MQ"));
    }

    #[test]
    fn test_status_details_deserialize() {
        let details: ProjectStatusDetails =
            serde_json::from_str(r#"{"domain": "ready", "project": "enabled"}"#).unwrap();
        assert_eq!(details.domain.as_deref(), Some("ready"));
        assert_eq!(details.project.as_deref(), Some("enabled"));
        assert!(details.vpe_not_enabled.is_none());
    }
}
