//! MCP Server handler for the Code Engine API.

use rmcp::{
    handler::server::ServerHandler,
    model::{
        CallToolRequestParam, CallToolResult, Content, ErrorData as McpError, Implementation,
        ListToolsResult, PaginatedRequestParam, ServerCapabilities, ServerInfo, Tool,
        ToolsCapability,
    },
    service::RequestContext,
    RoleServer,
};
use schemars::JsonSchema;
use serde::Serialize;
use std::sync::Arc;

use crate::{
    mcp::{DeleteParams, EntityType, GetParams, ListParams},
    App, AppInstance, AppInstanceListQuery, AppListQuery, AppRevision, AppRevisionId,
    AppRevisionListQuery, Build, BuildListQuery, BuildRun, BuildRunListQuery, CodeEngineClient,
    CodeEngineError, ConfigMap, ConfigMapListQuery, Delete, Get, Job, JobListQuery, JobRun,
    JobRunListQuery, List, Project, ProjectListQuery, ResourceId, Secret, SecretListQuery,
    DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE,
};

const REDACTED: &str = "[REDACTED]";

/// Code Engine MCP Server.
///
/// Implements the MCP ServerHandler trait, providing tools to interact
/// with the Code Engine API through the Model Context Protocol.
///
/// # Tools
///
/// - `get` - Fetch a single resource
/// - `list` - List resources one cursor page at a time
/// - `delete` - Request deletion of a resource
#[derive(Clone)]
pub struct CodeEngineServer {
    client: Arc<CodeEngineClient>,
}

impl CodeEngineServer {
    /// Create a new server from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if the client configuration is incomplete.
    pub fn from_env() -> crate::Result<Self> {
        let client = CodeEngineClient::from_env()?;
        Ok(Self::new(client))
    }

    /// Create a new server with an existing client.
    pub fn new(client: CodeEngineClient) -> Self {
        Self {
            client: Arc::new(client),
        }
    }

    /// Generate JSON Schema for a type.
    fn schema<T: JsonSchema>() -> Arc<serde_json::Map<String, serde_json::Value>> {
        let schema = schemars::schema_for!(T);
        let value = serde_json::to_value(&schema).unwrap_or(serde_json::json!({}));
        match value {
            serde_json::Value::Object(map) => Arc::new(map),
            _ => Arc::new(serde_json::Map::new()),
        }
    }

    /// Convert CodeEngineError to McpError.
    fn to_mcp_error(err: CodeEngineError) -> McpError {
        match &err {
            CodeEngineError::NotFound { entity_type, id } => {
                McpError::resource_not_found(format!("{entity_type} '{id}' not found"), None)
            }
            CodeEngineError::ConfigMissing(msg) | CodeEngineError::InvalidArgument(msg) => {
                McpError::invalid_params(msg.clone(), None)
            }
            _ => McpError::internal_error(err.to_string(), None),
        }
    }

    fn to_text<T: Serialize + ?Sized>(value: &T) -> Result<CallToolResult, McpError> {
        let text = serde_json::to_string_pretty(value)
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }

    fn require(value: Option<String>, field: &str, entity: EntityType) -> Result<String, McpError> {
        value.filter(|v| !v.is_empty()).ok_or_else(|| {
            McpError::invalid_params(format!("{field} is required for {entity:?}"), None)
        })
    }

    fn redact(mut secret: Secret) -> Secret {
        for value in secret.data.values_mut() {
            *value = REDACTED.to_string();
        }
        secret
    }

    /// Handle the `get` tool.
    ///
    /// Returns the resource as pretty-printed JSON in a `CallToolResult`.
    ///
    /// # Errors
    ///
    /// Returns an MCP error if a required scope is missing, the entity is
    /// `app_instance` (list only), or the underlying API call fails.
    pub async fn handle_get(&self, params: GetParams) -> Result<CallToolResult, McpError> {
        let client = &self.client;
        let entity = params.entity;
        if entity == EntityType::Project {
            let project = Project::get(client, params.name)
                .await
                .map_err(Self::to_mcp_error)?;
            return Self::to_text(&project);
        }

        let project_id = Self::require(params.project_id, "project_id", entity)?;
        let id = ResourceId::new(project_id.clone(), params.name.clone());
        match entity {
            EntityType::App => {
                Self::to_text(&App::get(client, id).await.map_err(Self::to_mcp_error)?)
            }
            EntityType::AppRevision => {
                let app = Self::require(params.app, "app", entity)?;
                let id = AppRevisionId::new(project_id, app, params.name);
                Self::to_text(&AppRevision::get(client, id).await.map_err(Self::to_mcp_error)?)
            }
            EntityType::Job => {
                Self::to_text(&Job::get(client, id).await.map_err(Self::to_mcp_error)?)
            }
            EntityType::JobRun => {
                Self::to_text(&JobRun::get(client, id).await.map_err(Self::to_mcp_error)?)
            }
            EntityType::Build => {
                Self::to_text(&Build::get(client, id).await.map_err(Self::to_mcp_error)?)
            }
            EntityType::BuildRun => {
                Self::to_text(&BuildRun::get(client, id).await.map_err(Self::to_mcp_error)?)
            }
            EntityType::ConfigMap => {
                Self::to_text(&ConfigMap::get(client, id).await.map_err(Self::to_mcp_error)?)
            }
            EntityType::Secret => {
                let secret = Secret::get(client, id).await.map_err(Self::to_mcp_error)?;
                Self::to_text(&Self::redact(secret))
            }
            EntityType::AppInstance => Err(McpError::invalid_params(
                "AppInstance does not support get. Use list with project_id and app.",
                None,
            )),
            EntityType::Project => Err(McpError::internal_error("unexpected entity", None)),
        }
    }

    async fn list_page_text<T: List + Serialize>(
        &self,
        query: T::Query,
        start: Option<&str>,
        limit: u32,
    ) -> Result<CallToolResult, McpError> {
        let page = T::list_page(&self.client, &query, start, limit)
            .await
            .map_err(Self::to_mcp_error)?;
        Self::to_text(&page)
    }

    /// Handle the `list` tool.
    ///
    /// Returns one page (`items`, `limit`, `next_start`, `has_more`); pass
    /// `next_start` back as `start` to continue.
    pub async fn handle_list(&self, params: ListParams) -> Result<CallToolResult, McpError> {
        let limit = params.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        let start = params.start.as_deref().filter(|s| !s.is_empty());
        let entity = params.entity;
        if entity == EntityType::Project {
            return self
                .list_page_text::<Project>(ProjectListQuery::default(), start, limit)
                .await;
        }

        let project_id = Self::require(params.project_id.clone(), "project_id", entity)?;
        match entity {
            EntityType::App => {
                self.list_page_text::<App>(AppListQuery::for_project(project_id), start, limit)
                    .await
            }
            EntityType::AppRevision => {
                let app = Self::require(params.app.clone(), "app", entity)?;
                let query = AppRevisionListQuery::for_app(project_id, app);
                self.list_page_text::<AppRevision>(query, start, limit).await
            }
            EntityType::AppInstance => {
                let app = Self::require(params.app.clone(), "app", entity)?;
                let query = AppInstanceListQuery::for_app(project_id, app);
                self.list_page_text::<AppInstance>(query, start, limit).await
            }
            EntityType::Job => {
                self.list_page_text::<Job>(JobListQuery::for_project(project_id), start, limit)
                    .await
            }
            EntityType::JobRun => {
                let mut query = JobRunListQuery::for_project(project_id);
                query.job_name = params.job_name.clone();
                self.list_page_text::<JobRun>(query, start, limit).await
            }
            EntityType::Build => {
                self.list_page_text::<Build>(BuildListQuery::for_project(project_id), start, limit)
                    .await
            }
            EntityType::BuildRun => {
                let mut query = BuildRunListQuery::for_project(project_id);
                query.build_name = params.build_name.clone();
                self.list_page_text::<BuildRun>(query, start, limit).await
            }
            EntityType::ConfigMap => {
                let query = ConfigMapListQuery::for_project(project_id);
                self.list_page_text::<ConfigMap>(query, start, limit).await
            }
            EntityType::Secret => {
                let page = Secret::list_page(
                    &self.client,
                    &SecretListQuery::for_project(project_id),
                    start,
                    limit,
                )
                .await
                .map_err(Self::to_mcp_error)?;
                Self::to_text(&page.map(Self::redact))
            }
            EntityType::Project => Err(McpError::internal_error("unexpected entity", None)),
        }
    }

    /// Handle the `delete` tool.
    pub async fn handle_delete(&self, params: DeleteParams) -> Result<CallToolResult, McpError> {
        let client = &self.client;
        let entity = params.entity;
        let name = params.name.clone();

        let result = if entity == EntityType::Project {
            Project::delete(client, params.name).await
        } else {
            let project_id = Self::require(params.project_id, "project_id", entity)?;
            let id = ResourceId::new(project_id.clone(), params.name.clone());
            match entity {
                EntityType::App => App::delete(client, id).await,
                EntityType::AppRevision => {
                    let app = Self::require(params.app, "app", entity)?;
                    AppRevision::delete(client, AppRevisionId::new(project_id, app, params.name))
                        .await
                }
                EntityType::Job => Job::delete(client, id).await,
                EntityType::JobRun => JobRun::delete(client, id).await,
                EntityType::Build => Build::delete(client, id).await,
                EntityType::BuildRun => BuildRun::delete(client, id).await,
                EntityType::ConfigMap => ConfigMap::delete(client, id).await,
                EntityType::Secret => Secret::delete(client, id).await,
                EntityType::AppInstance | EntityType::Project => {
                    return Err(McpError::invalid_params(
                        format!("Delete not supported for {entity:?}"),
                        None,
                    ));
                }
            }
        };
        result.map_err(Self::to_mcp_error)?;

        Ok(CallToolResult::success(vec![Content::text(format!(
            "Deletion of {entity:?} '{name}' requested"
        ))]))
    }
}

impl ServerHandler for CodeEngineServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: Default::default(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability {
                    list_changed: Some(false),
                }),
                ..Default::default()
            },
            server_info: Implementation {
                name: "codeengine".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            instructions: Some(
                "Code Engine MCP Server - Inspect and delete projects, apps, jobs, builds, \
                 config maps and secrets."
                    .to_string(),
            ),
        }
    }

    async fn list_tools(
        &self,
        _request: PaginatedRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        let tools = vec![
            Tool::new(
                "get",
                "Fetch a single Code Engine resource. \
                 Projects are addressed by ID; everything else by project_id + name. \
                 App revisions also need app. Secret values are redacted.",
                Self::schema::<GetParams>(),
            ),
            Tool::new(
                "list",
                "List Code Engine resources one page at a time. \
                 Pass next_start from the previous page as start to continue. \
                 App revisions and instances need app; job runs and build runs \
                 can be filtered by job_name / build_name.",
                Self::schema::<ListParams>(),
            ),
            Tool::new(
                "delete",
                "Request deletion of a Code Engine resource. Deleting a project \
                 deletes everything in it.",
                Self::schema::<DeleteParams>(),
            ),
        ];

        Ok(ListToolsResult {
            tools,
            next_cursor: None,
        })
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let args = request
            .arguments
            .map(serde_json::Value::Object)
            .unwrap_or(serde_json::json!({}));

        match request.name.as_ref() {
            "get" => {
                let params: GetParams = serde_json::from_value(args)
                    .map_err(|e| McpError::invalid_params(e.to_string(), None))?;
                self.handle_get(params).await
            }
            "list" => {
                let params: ListParams = serde_json::from_value(args)
                    .map_err(|e| McpError::invalid_params(e.to_string(), None))?;
                self.handle_list(params).await
            }
            "delete" => {
                let params: DeleteParams = serde_json::from_value(args)
                    .map_err(|e| McpError::invalid_params(e.to_string(), None))?;
                self.handle_delete(params).await
            }
            other => Err(McpError::invalid_params(
                format!("Unknown tool: {other}"),
                None,
            )),
        }
    }
}
