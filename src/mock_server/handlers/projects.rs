//! Project endpoint handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;

use super::{list_response, require_project, ApiError, ListQuery, SharedState};
use crate::mock_server::fixtures::Fixtures;
use crate::{Project, ProjectEgressIpAddresses, ProjectStatusDetails};

/// Request body for creating a project.
#[derive(Debug, Deserialize)]
pub struct CreateProjectBody {
    pub name: String,
    #[serde(default)]
    pub resource_group_id: Option<String>,
}

/// GET /projects
pub async fn list_projects(
    State(state): State<SharedState>,
    Query(query): Query<ListQuery>,
) -> Result<Response, ApiError> {
    let state = state.read().await;
    let projects: Vec<Project> = state.projects.values().cloned().collect();
    list_response("projects", "/v2/projects", projects, |p| p.id.as_str(), &query)
}

/// POST /projects
///
/// Project creation is asynchronous in the real service, hence 202.
pub async fn create_project(
    State(state): State<SharedState>,
    Json(body): Json<CreateProjectBody>,
) -> Result<impl IntoResponse, ApiError> {
    if body.name.trim().is_empty() {
        return Err(ApiError::bad_request("name is required"));
    }
    let mut state = state.write().await;
    if state.projects.values().any(|p| p.name == body.name) {
        return Err(ApiError::conflict("Project", &body.name));
    }

    let id = state.next_id();
    let mut project = Fixtures::project(&id, &body.name);
    project.created_at = Some(chrono::Utc::now());
    if let Some(group) = body.resource_group_id {
        project.resource_group_id = Some(group);
    }
    state.projects.insert(id, project.clone());
    Ok((StatusCode::ACCEPTED, Json(project)))
}

/// GET /projects/{project_id}
pub async fn get_project(
    State(state): State<SharedState>,
    Path(project_id): Path<String>,
) -> Result<Json<Project>, ApiError> {
    let state = state.read().await;
    state
        .get_project(&project_id)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Project", &project_id))
}

/// DELETE /projects/{project_id}
pub async fn delete_project(
    State(state): State<SharedState>,
    Path(project_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let mut state = state.write().await;
    match state.remove_project(&project_id) {
        Some(_) => Ok(StatusCode::ACCEPTED),
        None => Err(ApiError::not_found("Project", &project_id)),
    }
}

/// GET /projects/{project_id}/egress_ips
pub async fn get_project_egress_ips(
    State(state): State<SharedState>,
    Path(project_id): Path<String>,
) -> Result<Json<ProjectEgressIpAddresses>, ApiError> {
    let state = state.read().await;
    require_project(&state, &project_id)?;
    Ok(Json(ProjectEgressIpAddresses {
        private: vec!["10.240.0.10".to_string(), "10.240.64.10".to_string()],
        public: vec!["169.48.0.10".to_string()],
    }))
}

/// GET /projects/{project_id}/status_details
pub async fn get_project_status_details(
    State(state): State<SharedState>,
    Path(project_id): Path<String>,
) -> Result<Json<ProjectStatusDetails>, ApiError> {
    let state = state.read().await;
    require_project(&state, &project_id)?;
    Ok(Json(ProjectStatusDetails {
        domain: Some("ready".to_string()),
        project: Some("enabled".to_string()),
        vpe_not_enabled: Some(false),
    }))
}
