//! MCP tool parameter types with JSON Schema support.

use schemars::JsonSchema;
use serde::Deserialize;

/// Resource types supported by MCP tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    /// Project (addressed by ID).
    Project,
    /// App.
    App,
    /// App revision (requires `app`).
    AppRevision,
    /// Running app instance (requires `app`; list only).
    AppInstance,
    /// Job.
    Job,
    /// Job run.
    JobRun,
    /// Build.
    Build,
    /// Build run.
    BuildRun,
    /// Config map.
    ConfigMap,
    /// Secret (values are redacted).
    Secret,
}

/// Parameters for the `get` MCP tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct GetParams {
    /// The type of resource to fetch.
    pub entity: EntityType,
    /// Resource name, or the project ID when entity is `project`.
    pub name: String,
    /// Owning project ID (required for everything except projects).
    #[serde(default)]
    pub project_id: Option<String>,
    /// Owning app (required for app revisions).
    #[serde(default)]
    pub app: Option<String>,
}

/// Parameters for the `list` MCP tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ListParams {
    /// The type of resource to list.
    pub entity: EntityType,
    /// Owning project ID (required for everything except projects).
    #[serde(default)]
    pub project_id: Option<String>,
    /// Owning app (required for app revisions and instances).
    #[serde(default)]
    pub app: Option<String>,
    /// Only list runs of this job (job runs).
    #[serde(default)]
    pub job_name: Option<String>,
    /// Only list runs of this build (build runs).
    #[serde(default)]
    pub build_name: Option<String>,
    /// Cursor from the `next_start` of a previous page.
    #[serde(default)]
    pub start: Option<String>,
    /// Number of items per page (max 100).
    #[serde(default)]
    pub limit: Option<u32>,
}

/// Parameters for the `delete` MCP tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct DeleteParams {
    /// The type of resource to delete.
    pub entity: EntityType,
    /// Resource name, or the project ID when entity is `project`.
    pub name: String,
    /// Owning project ID (required for everything except projects).
    #[serde(default)]
    pub project_id: Option<String>,
    /// Owning app (required for app revisions).
    #[serde(default)]
    pub app: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_params_schema_generates() {
        let schema = schemars::schema_for!(GetParams);
        let json = serde_json::to_string(&schema).unwrap();
        assert!(json.contains("entity"));
        assert!(json.contains("name"));
        assert!(json.contains("project_id"));
    }

    #[test]
    fn list_params_schema_generates() {
        let schema = schemars::schema_for!(ListParams);
        let json = serde_json::to_string(&schema).unwrap();
        assert!(json.contains("start"));
        assert!(json.contains("limit"));
        assert!(json.contains("job_name"));
        assert!(json.contains("build_name"));
    }

    #[test]
    fn entity_type_schema_has_variants() {
        let schema = schemars::schema_for!(EntityType);
        let json = serde_json::to_string(&schema).unwrap();
        for variant in ["project", "app_revision", "job_run", "build_run", "config_map", "secret"] {
            assert!(json.contains(variant), "missing {variant}");
        }
    }

    #[test]
    fn get_params_deserializes() {
        let json = r#"{"entity": "app", "name": "my-app", "project_id": "p1"}"#;
        let params: GetParams = serde_json::from_str(json).unwrap();
        assert_eq!(params.entity, EntityType::App);
        assert_eq!(params.name, "my-app");
        assert_eq!(params.project_id.as_deref(), Some("p1"));
        assert!(params.app.is_none());
    }

    #[test]
    fn list_params_deserializes_with_defaults() {
        let json = r#"{"entity": "project"}"#;
        let params: ListParams = serde_json::from_str(json).unwrap();
        assert_eq!(params.entity, EntityType::Project);
        assert!(params.project_id.is_none());
        assert!(params.start.is_none());
        assert!(params.limit.is_none());
    }

    #[test]
    fn list_params_deserializes_with_all_fields() {
        let json = r#"{
            "entity": "job_run",
            "project_id": "p1",
            "job_name": "nightly",
            "start": "abc",
            "limit": 25
        }"#;
        let params: ListParams = serde_json::from_str(json).unwrap();
        assert_eq!(params.entity, EntityType::JobRun);
        assert_eq!(params.job_name.as_deref(), Some("nightly"));
        assert_eq!(params.start.as_deref(), Some("abc"));
        assert_eq!(params.limit, Some(25));
    }

    #[test]
    fn delete_params_requires_name() {
        let result: Result<DeleteParams, _> = serde_json::from_str(r#"{"entity": "app"}"#);
        assert!(result.is_err());
    }
}
