//! Job run and build run submission.
//!
//! Runs complete immediately: job runs are `completed` and build runs
//! `succeeded` as soon as they are created.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::{json, Map, Value};

use super::{insert_new, require_project, ApiError, SharedState};
use crate::mock_server::state::{MockResource, MockState};
use crate::{Build, BuildRun, Job, JobRun};

/// Copy `keys` from `source` into `target` where the target has no value.
fn inherit(target: &mut Map<String, Value>, source: &Value, keys: &[&str]) {
    for key in keys {
        if let Some(value) = source.get(*key).filter(|v| !v.is_null()) {
            target.entry(*key).or_insert_with(|| value.clone());
        }
    }
}

fn into_object(body: Value) -> Result<Map<String, Value>, ApiError> {
    match body {
        Value::Object(fields) => Ok(fields),
        _ => Err(ApiError::bad_request("request body must be a JSON object")),
    }
}

/// The requested run name, or a generated one not yet taken in the project.
fn run_name<T: MockResource>(
    state: &mut MockState,
    project_id: &str,
    fields: &Map<String, Value>,
    parent: Option<&str>,
) -> String {
    if let Some(name) = fields.get("name").and_then(Value::as_str).filter(|n| !n.is_empty()) {
        return name.to_string();
    }
    let prefix = parent.unwrap_or("run");
    loop {
        let candidate = format!("{prefix}-run-{}", state.next_sequence());
        if state.get::<T>(project_id, &candidate).is_none() {
            return candidate;
        }
    }
}

/// POST /projects/{project_id}/job_runs
///
/// With `job_name`, the run inherits the job's configuration; without it
/// the body must carry an `image_reference`.
pub async fn create_job_run(
    State(state): State<SharedState>,
    Path(project_id): Path<String>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, ApiError> {
    let mut fields = into_object(body)?;
    let mut state = state.write().await;
    require_project(&state, &project_id)?;

    let job_name = fields.get("job_name").and_then(Value::as_str).map(str::to_string);
    if let Some(ref job_name) = job_name {
        let job = state
            .get::<Job>(&project_id, job_name)
            .ok_or_else(|| ApiError::not_found("Job", job_name))?;
        let job = serde_json::to_value(job)?;
        inherit(
            &mut fields,
            &job,
            &[
                "image_reference",
                "image_secret",
                "run_arguments",
                "run_commands",
                "run_env_variables",
                "run_mode",
                "scale_array_spec",
                "scale_cpu_limit",
                "scale_memory_limit",
                "scale_max_execution_time",
                "scale_retry_limit",
            ],
        );
    } else if !fields.contains_key("image_reference") {
        return Err(ApiError::bad_request(
            "either job_name or image_reference is required",
        ));
    }

    let name = run_name::<JobRun>(&mut state, &project_id, &fields, job_name.as_deref());
    let now = chrono::Utc::now();
    fields.insert("name".into(), json!(name));
    fields.insert(
        "status_details".into(),
        json!({
            "requested": 1,
            "succeeded": 1,
            "failed": 0,
            "running": 0,
            "start_time": now,
            "completion_time": now,
        }),
    );

    let run: JobRun = insert_new(&mut state, &project_id, Value::Object(fields))?;
    Ok((StatusCode::ACCEPTED, Json(run)))
}

/// POST /projects/{project_id}/build_runs
///
/// With `build_name`, the run inherits the build's configuration; without
/// it the body must carry an `output_image`.
pub async fn create_build_run(
    State(state): State<SharedState>,
    Path(project_id): Path<String>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, ApiError> {
    let mut fields = into_object(body)?;
    let mut state = state.write().await;
    require_project(&state, &project_id)?;

    let build_name = fields.get("build_name").and_then(Value::as_str).map(str::to_string);
    if let Some(ref build_name) = build_name {
        let build = state
            .get::<Build>(&project_id, build_name)
            .ok_or_else(|| ApiError::not_found("Build", build_name))?;
        let build = serde_json::to_value(build)?;
        inherit(
            &mut fields,
            &build,
            &[
                "output_image",
                "output_secret",
                "source_type",
                "source_url",
                "source_revision",
                "strategy_type",
                "strategy_size",
                "timeout",
            ],
        );
    } else if !fields.contains_key("output_image") {
        return Err(ApiError::bad_request(
            "either build_name or output_image is required",
        ));
    }

    let name = run_name::<BuildRun>(&mut state, &project_id, &fields, build_name.as_deref());
    let now = chrono::Utc::now();
    let digest = format!("sha256:{:064x}", state.next_sequence());
    fields.insert("name".into(), json!(name));
    fields.insert(
        "status_details".into(),
        json!({
            "reason": "all done",
            "output_digest": digest,
            "start_time": now,
            "completion_time": now,
        }),
    );

    let run: BuildRun = insert_new(&mut state, &project_id, Value::Object(fields))?;
    Ok((StatusCode::ACCEPTED, Json(run)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock_server::Fixtures;

    #[test]
    fn test_inherit_keeps_explicit_values() {
        let mut target = Map::new();
        target.insert("image_reference".into(), json!("custom"));
        let source = json!({
            "image_reference": "job-image",
            "run_mode": "task",
            "image_secret": null
        });

        inherit(&mut target, &source, &["image_reference", "run_mode", "image_secret"]);

        assert_eq!(target["image_reference"], "custom");
        assert_eq!(target["run_mode"], "task");
        assert!(!target.contains_key("image_secret"));
    }

    #[test]
    fn test_generated_run_name_skips_taken_names() {
        // The next sequence value is 1, so the first candidate is taken.
        let mut state = MockState::new()
            .with("p1", Fixtures::job_run("p1", "nightly", "nightly-run-1", "completed"));

        let name = run_name::<JobRun>(&mut state, "p1", &Map::new(), Some("nightly"));

        assert_eq!(name, "nightly-run-2");
        assert!(state.get::<JobRun>("p1", &name).is_none());
    }

    #[test]
    fn test_requested_run_name_is_kept() {
        let mut state = MockState::new();
        let mut fields = Map::new();
        fields.insert("name".into(), json!("manual"));

        assert_eq!(run_name::<BuildRun>(&mut state, "p1", &fields, Some("b")), "manual");
    }
}
