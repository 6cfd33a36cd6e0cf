//! HTTP handlers for the mock server.

mod apps;
mod iam;
mod projects;
mod resources;
mod runs;

pub use apps::*;
pub use iam::*;
pub use projects::*;
pub use resources::*;
pub use runs::*;

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::sync::RwLock;

use super::state::{MockResource, MockState};

pub type SharedState = Arc<RwLock<MockState>>;

/// Page size used when a request has no `limit`.
pub const DEFAULT_LIMIT: u32 = 50;
/// Largest `limit` the server accepts.
pub const MAX_LIMIT: u32 = 100;

/// An error rendered in the API's error envelope.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn not_found(kind: &str, id: &str) -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found", format!("{kind} '{id}' was not found"))
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "invalid_request", message)
    }

    pub fn conflict(kind: &str, name: &str) -> Self {
        Self::new(StatusCode::CONFLICT, "already_exists", format!("{kind} '{name}' already exists"))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({
            "errors": [{ "code": self.code, "message": self.message }],
            "status_code": self.status.as_u16(),
            "trace": "mock-trace-0001",
        });
        (self.status, Json(body)).into_response()
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::bad_request(err.to_string())
    }
}

/// Query parameters accepted by list endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub start: Option<String>,
    pub limit: Option<u32>,
    pub job_name: Option<String>,
    pub build_name: Option<String>,
}

/// Render one page of `items` in the list envelope.
///
/// `items` must be sorted by cursor. The cursor of the first item left off
/// the page becomes `next.start`.
pub fn list_response<T, F>(
    key: &str,
    href: &str,
    items: Vec<T>,
    cursor_of: F,
    query: &ListQuery,
) -> Result<Response, ApiError>
where
    T: Serialize,
    F: Fn(&T) -> &str,
{
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);
    if limit == 0 || limit > MAX_LIMIT {
        return Err(ApiError::bad_request(format!(
            "limit must be between 1 and {MAX_LIMIT}"
        )));
    }

    let mut page: Vec<T> = match query.start.as_deref().filter(|s| !s.is_empty()) {
        Some(start) => items.into_iter().skip_while(|i| cursor_of(i) < start).collect(),
        None => items,
    };
    let rest = if page.len() > limit as usize {
        page.split_off(limit as usize)
    } else {
        Vec::new()
    };

    let mut body = Map::new();
    body.insert("first".into(), json!({ "href": format!("{href}?limit={limit}") }));
    body.insert("limit".into(), json!(limit));
    if let Some(start) = rest.first().map(|i| cursor_of(i).to_string()) {
        body.insert(
            "next".into(),
            json!({
                "href": format!("{href}?limit={limit}&start={}", urlencoding::encode(&start)),
                "start": start,
            }),
        );
    }
    body.insert(key.into(), serde_json::to_value(page)?);

    Ok((StatusCode::OK, Json(Value::Object(body))).into_response())
}

/// Apply a JSON merge patch (RFC 7386) to `target`.
pub fn merge_patch(target: &mut Value, patch: &Value) {
    let Value::Object(fields) = patch else {
        *target = patch.clone();
        return;
    };
    if !target.is_object() {
        *target = Value::Object(Map::new());
    }
    if let Value::Object(map) = target {
        for (key, value) in fields {
            if value.is_null() {
                map.remove(key);
            } else {
                merge_patch(map.entry(key.clone()).or_insert(Value::Null), value);
            }
        }
    }
}

/// Check the request's `If-Match` header against the stored entity tag.
pub fn check_if_match(headers: &HeaderMap, entity_tag: &str) -> Result<(), ApiError> {
    let Some(value) = headers.get(header::IF_MATCH).and_then(|v| v.to_str().ok()) else {
        return Err(ApiError::new(
            StatusCode::PRECONDITION_REQUIRED,
            "precondition_required",
            "If-Match header is required",
        ));
    };
    if value == "*" || value.trim_matches('"') == entity_tag {
        Ok(())
    } else {
        Err(ApiError::new(
            StatusCode::PRECONDITION_FAILED,
            "precondition_failed",
            format!("entity tag '{value}' does not match '{entity_tag}'"),
        ))
    }
}

/// Reject requests without the configured bearer token.
pub async fn require_token(
    State(state): State<SharedState>,
    request: Request,
    next: Next,
) -> Response {
    let expected = state.read().await.required_token.clone();
    if let Some(expected) = expected {
        let supplied = request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "));
        if supplied != Some(expected.as_str()) {
            return ApiError::new(
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "invalid or missing token",
            )
            .into_response();
        }
    }
    next.run(request).await
}

/// Fail with 404 unless the project exists.
pub(crate) fn require_project(state: &MockState, project_id: &str) -> Result<(), ApiError> {
    match state.get_project(project_id) {
        Some(_) => Ok(()),
        None => Err(ApiError::not_found("Project", project_id)),
    }
}

/// Fill server-managed fields into a create body and store the result.
pub(crate) fn insert_new<T: MockResource>(
    state: &mut MockState,
    project_id: &str,
    mut body: Value,
) -> Result<T, ApiError> {
    require_project(state, project_id)?;
    let name = body
        .get("name")
        .and_then(Value::as_str)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| ApiError::bad_request("name is required"))?
        .to_string();
    if state.get::<T>(project_id, &name).is_some() {
        return Err(ApiError::conflict(T::KIND, &name));
    }

    let id = state.next_id();
    let entity_tag = state.next_entity_tag();
    let Value::Object(fields) = &mut body else {
        return Err(ApiError::bad_request("request body must be a JSON object"));
    };
    fields.insert("id".into(), json!(id));
    fields.insert("project_id".into(), json!(project_id));
    fields.insert("region".into(), json!(super::fixtures::MOCK_REGION));
    fields.insert(
        "href".into(),
        json!(format!("/v2/projects/{project_id}/{}/{name}", T::COLLECTION)),
    );
    fields.insert("created_at".into(), json!(chrono::Utc::now()));
    fields.insert("resource_type".into(), json!(T::RESOURCE_TYPE));
    fields.insert("entity_tag".into(), json!(entity_tag));
    if let Some(status) = T::INITIAL_STATUS {
        fields.entry("status").or_insert_with(|| json!(status));
    }

    let mut item: T = serde_json::from_value(body)?;
    item.after_write(state, project_id);
    T::store_mut(state).insert((project_id.to_string(), name), item.clone());
    Ok(item)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_patch() {
        let mut target = json!({"a": "b", "c": {"d": "e", "f": "g"}});
        merge_patch(&mut target, &json!({"a": "z", "c": {"f": null}}));
        assert_eq!(target, json!({"a": "z", "c": {"d": "e"}}));

        merge_patch(&mut target, &json!({"list": [1, 2]}));
        assert_eq!(target["list"], json!([1, 2]));
    }

    #[test]
    fn test_check_if_match() {
        let mut headers = HeaderMap::new();
        assert_eq!(
            check_if_match(&headers, "7").unwrap_err().status,
            StatusCode::PRECONDITION_REQUIRED
        );

        headers.insert(header::IF_MATCH, "6".parse().unwrap());
        assert_eq!(
            check_if_match(&headers, "7").unwrap_err().status,
            StatusCode::PRECONDITION_FAILED
        );

        headers.insert(header::IF_MATCH, "7".parse().unwrap());
        assert!(check_if_match(&headers, "7").is_ok());

        headers.insert(header::IF_MATCH, "*".parse().unwrap());
        assert!(check_if_match(&headers, "7").is_ok());
    }

    #[test]
    fn test_list_response_rejects_oversized_limit() {
        let query = ListQuery {
            limit: Some(MAX_LIMIT + 1),
            ..Default::default()
        };
        let result = list_response("items", "/x", vec!["a".to_string()], |s| s.as_str(), &query);
        assert_eq!(result.unwrap_err().status, StatusCode::BAD_REQUEST);
    }
}
