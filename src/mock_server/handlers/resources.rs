//! Generic handlers for project-scoped resources.
//!
//! Apps, jobs, builds, config maps and secrets all share these; the
//! resource kind is picked by the type parameter when routing.

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;

use super::{
    check_if_match, insert_new, list_response, merge_patch, require_project, ApiError, ListQuery,
    SharedState,
};
use crate::mock_server::state::{MockResource, MockState};

/// GET /projects/{project_id}/{collection}
pub async fn list_resources<T: MockResource>(
    State(state): State<SharedState>,
    Path(project_id): Path<String>,
    Query(query): Query<ListQuery>,
) -> Result<Response, ApiError> {
    let state = state.read().await;
    require_project(&state, &project_id)?;

    let items: Vec<T> = state
        .list::<T>(&project_id)
        .into_iter()
        .filter(|item| item.matches(query.job_name.as_deref(), query.build_name.as_deref()))
        .cloned()
        .collect();
    let href = format!("/v2/projects/{project_id}/{}", T::COLLECTION);
    list_response(T::COLLECTION, &href, items, |item| item.name(), &query)
}

/// POST /projects/{project_id}/{collection}
pub async fn create_resource<T: MockResource>(
    State(state): State<SharedState>,
    Path(project_id): Path<String>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, ApiError> {
    let mut state = state.write().await;
    let item: T = insert_new(&mut state, &project_id, body)?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// GET /projects/{project_id}/{collection}/{name}
pub async fn get_resource<T: MockResource>(
    State(state): State<SharedState>,
    Path((project_id, name)): Path<(String, String)>,
) -> Result<Json<T>, ApiError> {
    let state = state.read().await;
    state
        .get::<T>(&project_id, &name)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiError::not_found(T::KIND, &name))
}

/// PATCH /projects/{project_id}/{collection}/{name}
///
/// Applies the body as a JSON merge patch.
pub async fn update_resource<T: MockResource>(
    State(state): State<SharedState>,
    Path((project_id, name)): Path<(String, String)>,
    headers: HeaderMap,
    Json(patch): Json<Value>,
) -> Result<Json<T>, ApiError> {
    let mut state = state.write().await;
    let updated: T = rewrite(&mut state, &project_id, &name, &headers, |current| {
        merge_patch(current, &patch)
    })?;
    Ok(Json(updated))
}

/// PUT /projects/{project_id}/{collection}/{name}
///
/// Replaces every top-level field present in the body (`data`, `format`).
pub async fn replace_resource<T: MockResource>(
    State(state): State<SharedState>,
    Path((project_id, name)): Path<(String, String)>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Json<T>, ApiError> {
    let Value::Object(replacement) = body else {
        return Err(ApiError::bad_request("request body must be a JSON object"));
    };
    let mut state = state.write().await;
    let updated: T = rewrite(&mut state, &project_id, &name, &headers, |current| {
        if let Value::Object(fields) = current {
            fields.extend(replacement);
        }
    })?;
    Ok(Json(updated))
}

/// DELETE /projects/{project_id}/{collection}/{name}
pub async fn delete_resource<T: MockResource>(
    State(state): State<SharedState>,
    Path((project_id, name)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let mut state = state.write().await;
    let key = (project_id.clone(), name.clone());
    if T::store_mut(&mut state).remove(&key).is_none() {
        return Err(ApiError::not_found(T::KIND, &name));
    }
    T::after_delete(&mut state, &project_id, &name);
    Ok(StatusCode::ACCEPTED)
}

/// Load a stored item as JSON, check `If-Match`, edit it and store it back
/// under a fresh entity tag.
fn rewrite<T: MockResource>(
    state: &mut MockState,
    project_id: &str,
    name: &str,
    headers: &HeaderMap,
    edit: impl FnOnce(&mut Value),
) -> Result<T, ApiError> {
    let current = state
        .get::<T>(project_id, name)
        .ok_or_else(|| ApiError::not_found(T::KIND, name))?;
    let mut value = serde_json::to_value(current)?;
    let entity_tag = value
        .get("entity_tag")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    check_if_match(headers, &entity_tag)?;

    edit(&mut value);
    if !value.is_object() {
        return Err(ApiError::bad_request("request body must be a JSON object"));
    }
    value["name"] = Value::String(name.to_string());
    value["project_id"] = Value::String(project_id.to_string());
    value["entity_tag"] = Value::String(state.next_entity_tag());

    let mut item: T = serde_json::from_value(value)?;
    item.after_write(state, project_id);
    T::store_mut(state).insert((project_id.to_string(), name.to_string()), item.clone());
    Ok(item)
}
