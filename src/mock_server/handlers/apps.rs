//! App revision and instance handlers.
//!
//! Apps themselves use the generic resource handlers; revisions and
//! instances are nested under their app.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Response,
    Json,
};

use super::{list_response, require_project, ApiError, ListQuery, SharedState};
use crate::mock_server::state::{MockResource, MockState};
use crate::{App, AppInstance, AppRevision};

fn require_app(state: &MockState, project_id: &str, app_name: &str) -> Result<(), ApiError> {
    require_project(state, project_id)?;
    match state.get::<App>(project_id, app_name) {
        Some(_) => Ok(()),
        None => Err(ApiError::not_found("App", app_name)),
    }
}

/// GET /projects/{project_id}/apps/{app_name}/revisions
pub async fn list_app_revisions(
    State(state): State<SharedState>,
    Path((project_id, app_name)): Path<(String, String)>,
    Query(query): Query<ListQuery>,
) -> Result<Response, ApiError> {
    let state = state.read().await;
    require_app(&state, &project_id, &app_name)?;

    let revisions: Vec<AppRevision> = state
        .list::<AppRevision>(&project_id)
        .into_iter()
        .filter(|r| r.app_name.as_deref() == Some(app_name.as_str()))
        .cloned()
        .collect();
    let href = format!("/v2/projects/{project_id}/apps/{app_name}/revisions");
    list_response("revisions", &href, revisions, |r| r.name.as_str(), &query)
}

/// GET /projects/{project_id}/apps/{app_name}/revisions/{name}
pub async fn get_app_revision(
    State(state): State<SharedState>,
    Path((project_id, app_name, name)): Path<(String, String, String)>,
) -> Result<Json<AppRevision>, ApiError> {
    let state = state.read().await;
    state
        .get::<AppRevision>(&project_id, &name)
        .filter(|r| r.app_name.as_deref() == Some(app_name.as_str()))
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiError::not_found(AppRevision::KIND, &name))
}

/// DELETE /projects/{project_id}/apps/{app_name}/revisions/{name}
///
/// The revision currently serving traffic cannot be deleted.
pub async fn delete_app_revision(
    State(state): State<SharedState>,
    Path((project_id, app_name, name)): Path<(String, String, String)>,
) -> Result<StatusCode, ApiError> {
    let mut state = state.write().await;
    let owned = state
        .get::<AppRevision>(&project_id, &name)
        .is_some_and(|r| r.app_name.as_deref() == Some(app_name.as_str()));
    if !owned {
        return Err(ApiError::not_found(AppRevision::KIND, &name));
    }
    let serving = state
        .get::<App>(&project_id, &app_name)
        .and_then(App::latest_ready_revision)
        == Some(name.as_str());
    if serving {
        return Err(ApiError::new(
            StatusCode::CONFLICT,
            "revision_in_use",
            format!("revision '{name}' is serving traffic"),
        ));
    }

    state.app_revisions.remove(&(project_id.clone(), name.clone()));
    AppRevision::after_delete(&mut state, &project_id, &name);
    Ok(StatusCode::ACCEPTED)
}

/// GET /projects/{project_id}/apps/{app_name}/instances
pub async fn list_app_instances(
    State(state): State<SharedState>,
    Path((project_id, app_name)): Path<(String, String)>,
    Query(query): Query<ListQuery>,
) -> Result<Response, ApiError> {
    let state = state.read().await;
    require_app(&state, &project_id, &app_name)?;

    let instances: Vec<AppInstance> = state
        .list::<AppInstance>(&project_id)
        .into_iter()
        .filter(|i| i.app_name.as_deref() == Some(app_name.as_str()))
        .cloned()
        .collect();
    let href = format!("/v2/projects/{project_id}/apps/{app_name}/instances");
    list_response("instances", &href, instances, |i| i.name.as_str(), &query)
}
