//! Config map model and trait implementations.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::client::CodeEngineClient;
use crate::error::{require, CodeEngineError, Result};
use crate::models::common::{collection_path, ResourceId};
use crate::pagination::{Page, PageLink, PaginationParams};
use crate::traits::{Create, Delete, Get, List, Update};

/// Non-sensitive key-value configuration that can be injected into
/// workloads as environment variables or mounted files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigMap {
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

    /// Always "config_map_v2".
    #[serde(default)]
    pub resource_type: Option<String>,

    #[serde(default)]
    pub entity_tag: String,

    #[serde(default)]
    pub data: BTreeMap<String, String>,
}

impl ConfigMap {
    /// Entity tag to pass as `If-Match` when replacing.
    pub fn entity_tag(&self) -> &str {
        &self.entity_tag
    }

    pub fn get_value(&self, key: &str) -> Option<&str> {
        self.data.get(key).map(String::as_str)
    }
}

/// Query parameters for listing config maps.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConfigMapListQuery {
    #[serde(skip)]
    pub project_id: String,
}

impl ConfigMapListQuery {
    pub fn for_project(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
        }
    }
}

/// Parameters for creating a config map.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConfigMapCreateParams {
    #[serde(skip)]
    pub project_id: String,
    pub name: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub data: BTreeMap<String, String>,
}

impl ConfigMapCreateParams {
    pub fn new(project_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            name: name.into(),
            data: BTreeMap::new(),
        }
    }

    pub fn with_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }
}

/// Full replacement of a config map's data. Keys not present are removed.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConfigMapReplaceParams {
    pub data: BTreeMap<String, String>,
}

impl ConfigMapReplaceParams {
    pub fn with_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }
}

impl From<BTreeMap<String, String>> for ConfigMapReplaceParams {
    fn from(data: BTreeMap<String, String>) -> Self {
        Self { data }
    }
}

#[derive(Debug, Deserialize)]
struct ConfigMapListResponse {
    #[serde(default)]
    config_maps: Vec<ConfigMap>,
    #[serde(default)]
    limit: Option<u32>,
    #[serde(default)]
    next: Option<PageLink>,
}

#[async_trait]
impl Get for ConfigMap {
    type Id = ResourceId;

    #[tracing::instrument(skip(client))]
    async fn get(client: &CodeEngineClient, id: ResourceId) -> Result<Self> {
        let path = id.path("config_maps")?;
        let response = client
            .get(&path)
            .await
            .map_err(|e| e.or_not_found("ConfigMap", id.to_string()))?;
        let config_map: ConfigMap = response.json().await.map_err(CodeEngineError::HttpError)?;
        Ok(config_map)
    }
}

#[async_trait]
impl List for ConfigMap {
    type Query = ConfigMapListQuery;

    #[tracing::instrument(skip(client))]
    async fn list_page(
        client: &CodeEngineClient,
        query: &Self::Query,
        start: Option<&str>,
        limit: u32,
    ) -> Result<Page<Self>> {
        let path = collection_path(&query.project_id, "config_maps")?;
        let params = PaginationParams::new(start, limit);

        let response = client.get_with_query(&path, &params).await?;
        let data: ConfigMapListResponse =
            response.json().await.map_err(CodeEngineError::HttpError)?;

        Ok(Page::new(data.config_maps, data.limit.unwrap_or(limit), data.next.as_ref()))
    }
}

#[async_trait]
impl Create for ConfigMap {
    type Params = ConfigMapCreateParams;

    #[tracing::instrument(skip(client))]
    async fn create(client: &CodeEngineClient, params: Self::Params) -> Result<Self> {
        let path = collection_path(&params.project_id, "config_maps")?;
        require("name", &params.name)?;

        let response = client.post(&path, &params).await?;
        let config_map: ConfigMap = response.json().await.map_err(CodeEngineError::HttpError)?;
        Ok(config_map)
    }
}

/// Replaces the whole config map (PUT).
#[async_trait]
impl Update for ConfigMap {
    type Id = ResourceId;
    type Params = ConfigMapReplaceParams;

    #[tracing::instrument(skip(client))]
    async fn update(
        client: &CodeEngineClient,
        id: ResourceId,
        if_match: &str,
        params: Self::Params,
    ) -> Result<Self> {
        let path = id.path("config_maps")?;
        require("if_match", if_match)?;

        let response = client
            .put(&path, if_match, &params)
            .await
            .map_err(|e| e.or_not_found("ConfigMap", id.to_string()))?;
        let config_map: ConfigMap = response.json().await.map_err(CodeEngineError::HttpError)?;
        Ok(config_map)
    }
}

#[async_trait]
impl Delete for ConfigMap {
    type Id = ResourceId;

    #[tracing::instrument(skip(client))]
    async fn delete(client: &CodeEngineClient, id: ResourceId) -> Result<()> {
        let path = id.path("config_maps")?;
        client
            .delete(&path)
            .await
            .map_err(|e| e.or_not_found("ConfigMap", id.to_string()))?;
        Ok(())
    }
}

// Convenience functions

/// Get a single config map.
pub async fn get_config_map(
    client: &CodeEngineClient,
    project_id: &str,
    name: &str,
) -> Result<ConfigMap> {
    ConfigMap::get(client, ResourceId::new(project_id, name)).await
}

/// Fetch all config maps of a project.
pub async fn list_config_maps(
    client: &CodeEngineClient,
    project_id: &str,
) -> Result<Vec<ConfigMap>> {
    ConfigMap::list_all(client, &ConfigMapListQuery::for_project(project_id)).await
}

/// Replace the data of a config map, guarded by its entity tag.
pub async fn replace_config_map(
    client: &CodeEngineClient,
    project_id: &str,
    name: &str,
    if_match: &str,
    data: BTreeMap<String, String>,
) -> Result<ConfigMap> {
    ConfigMap::update(client, ResourceId::new(project_id, name), if_match, data.into()).await
}

/// Delete a config map.
pub async fn delete_config_map(
    client: &CodeEngineClient,
    project_id: &str,
    name: &str,
) -> Result<()> {
    ConfigMap::delete(client, ResourceId::new(project_id, name)).await
}
