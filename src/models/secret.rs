//! Secret model and trait implementations.
//!
//! Secret values never appear in `Debug` output, so they stay out of
//! tracing spans and logs.

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

use crate::client::CodeEngineClient;
use crate::error::{require, CodeEngineError, Result};
use crate::models::common::{collection_path, ResourceId};
use crate::pagination::{Page, PageLink, PaginationParams};
use crate::traits::{Create, Delete, Get, List, Update};

/// Kind of secret, which determines the keys expected in `data`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecretFormat {
    #[default]
    Generic,
    SshAuth,
    BasicAuth,
    Tls,
    Registry,
    ServiceAccess,
    ServiceOperator,
    /// "other", or any format this client does not know yet.
    #[serde(other)]
    Other,
}

impl SecretFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Generic => "generic",
            Self::SshAuth => "ssh_auth",
            Self::BasicAuth => "basic_auth",
            Self::Tls => "tls",
            Self::Registry => "registry",
            Self::ServiceAccess => "service_access",
            Self::ServiceOperator => "service_operator",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for SecretFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Debug view of secret data: keys only.
struct MaskedData<'a>(&'a BTreeMap<String, String>);

impl fmt::Debug for MaskedData<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.0.keys().map(|k| (k, "[REDACTED]")))
            .finish()
    }
}

/// Sensitive key-value data such as credentials, certificates or registry logins.
#[derive(Clone, Serialize, Deserialize)]
pub struct Secret {
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

    /// Always "secret_v2".
    #[serde(default)]
    pub resource_type: Option<String>,

    #[serde(default)]
    pub entity_tag: String,

    #[serde(default)]
    pub format: SecretFormat,

    #[serde(default)]
    pub data: BTreeMap<String, String>,

    /// Service binding details for `service_access` secrets.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_access: Option<serde_json::Value>,

    /// Operator details for `service_operator` secrets.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_operator: Option<serde_json::Value>,
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secret")
            .field("name", &self.name)
            .field("project_id", &self.project_id)
            .field("format", &self.format)
            .field("entity_tag", &self.entity_tag)
            .field("data", &MaskedData(&self.data))
            .finish_non_exhaustive()
    }
}

impl Secret {
    /// Entity tag to pass as `If-Match` when replacing.
    pub fn entity_tag(&self) -> &str {
        &self.entity_tag
    }

    /// Keys stored in this secret.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.data.keys().map(String::as_str)
    }
}

/// Query parameters for listing secrets.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SecretListQuery {
    #[serde(skip)]
    pub project_id: String,
}

impl SecretListQuery {
    pub fn for_project(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
        }
    }
}

/// Parameters for creating a secret.
#[skip_serializing_none]
#[derive(Clone, Default, Serialize)]
pub struct SecretCreateParams {
    #[serde(skip)]
    pub project_id: String,
    pub name: String,
    pub format: SecretFormat,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub data: BTreeMap<String, String>,
    pub service_access: Option<serde_json::Value>,
    pub service_operator: Option<serde_json::Value>,
}

impl fmt::Debug for SecretCreateParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretCreateParams")
            .field("project_id", &self.project_id)
            .field("name", &self.name)
            .field("format", &self.format)
            .field("data", &MaskedData(&self.data))
            .finish_non_exhaustive()
    }
}

impl SecretCreateParams {
    pub fn new(
        project_id: impl Into<String>,
        name: impl Into<String>,
        format: SecretFormat,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            name: name.into(),
            format,
            ..Default::default()
        }
    }

    pub fn with_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }
}

/// Full replacement of a secret's data.
#[skip_serializing_none]
#[derive(Clone, Default, Serialize)]
pub struct SecretReplaceParams {
    pub format: Option<SecretFormat>,
    pub data: BTreeMap<String, String>,
}

impl fmt::Debug for SecretReplaceParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretReplaceParams")
            .field("format", &self.format)
            .field("data", &MaskedData(&self.data))
            .finish()
    }
}

impl SecretReplaceParams {
    pub fn with_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }
}

#[derive(Deserialize)]
struct SecretListResponse {
    #[serde(default)]
    secrets: Vec<Secret>,
    #[serde(default)]
    limit: Option<u32>,
    #[serde(default)]
    next: Option<PageLink>,
}

#[async_trait]
impl Get for Secret {
    type Id = ResourceId;

    #[tracing::instrument(skip(client))]
    async fn get(client: &CodeEngineClient, id: ResourceId) -> Result<Self> {
        let path = id.path("secrets")?;
        let response = client
            .get(&path)
            .await
            .map_err(|e| e.or_not_found("Secret", id.to_string()))?;
        let secret: Secret = response.json().await.map_err(CodeEngineError::HttpError)?;
        Ok(secret)
    }
}

#[async_trait]
impl List for Secret {
    type Query = SecretListQuery;

    #[tracing::instrument(skip(client))]
    async fn list_page(
        client: &CodeEngineClient,
        query: &Self::Query,
        start: Option<&str>,
        limit: u32,
    ) -> Result<Page<Self>> {
        let path = collection_path(&query.project_id, "secrets")?;
        let params = PaginationParams::new(start, limit);

        let response = client.get_with_query(&path, &params).await?;
        let data: SecretListResponse = response.json().await.map_err(CodeEngineError::HttpError)?;

        Ok(Page::new(data.secrets, data.limit.unwrap_or(limit), data.next.as_ref()))
    }
}

#[async_trait]
impl Create for Secret {
    type Params = SecretCreateParams;

    #[tracing::instrument(skip(client))]
    async fn create(client: &CodeEngineClient, params: Self::Params) -> Result<Self> {
        let path = collection_path(&params.project_id, "secrets")?;
        require("name", &params.name)?;

        let response = client.post(&path, &params).await?;
        let secret: Secret = response.json().await.map_err(CodeEngineError::HttpError)?;
        Ok(secret)
    }
}

/// Replaces the whole secret (PUT).
#[async_trait]
impl Update for Secret {
    type Id = ResourceId;
    type Params = SecretReplaceParams;

    #[tracing::instrument(skip(client))]
    async fn update(
        client: &CodeEngineClient,
        id: ResourceId,
        if_match: &str,
        params: Self::Params,
    ) -> Result<Self> {
        let path = id.path("secrets")?;
        require("if_match", if_match)?;

        let response = client
            .put(&path, if_match, &params)
            .await
            .map_err(|e| e.or_not_found("Secret", id.to_string()))?;
        let secret: Secret = response.json().await.map_err(CodeEngineError::HttpError)?;
        Ok(secret)
    }
}

#[async_trait]
impl Delete for Secret {
    type Id = ResourceId;

    #[tracing::instrument(skip(client))]
    async fn delete(client: &CodeEngineClient, id: ResourceId) -> Result<()> {
        let path = id.path("secrets")?;
        client
            .delete(&path)
            .await
            .map_err(|e| e.or_not_found("Secret", id.to_string()))?;
        Ok(())
    }
}

// Convenience functions

/// Get a single secret.
pub async fn get_secret(client: &CodeEngineClient, project_id: &str, name: &str) -> Result<Secret> {
    Secret::get(client, ResourceId::new(project_id, name)).await
}

/// Fetch all secrets of a project.
pub async fn list_secrets(client: &CodeEngineClient, project_id: &str) -> Result<Vec<Secret>> {
    Secret::list_all(client, &SecretListQuery::for_project(project_id)).await
}

/// Replace the format and data of a secret, guarded by its entity tag.
pub async fn replace_secret(
    client: &CodeEngineClient,
    project_id: &str,
    name: &str,
    if_match: &str,
    params: SecretReplaceParams,
) -> Result<Secret> {
    Secret::update(client, ResourceId::new(project_id, name), if_match, params).await
}

/// Delete a secret.
pub async fn delete_secret(client: &CodeEngineClient, project_id: &str, name: &str) -> Result<()> {
    Secret::delete(client, ResourceId::new(project_id, name)).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_deserialize() {
        let json = r#"{
            "created_at": "2022-09-13T11:41:35+02:00",
            "data": {"password": "hunter2", "username": "admin"},
            "entity_tag": "2385407409",
            "format": "basic_auth",
            "name": "my-secret",
            "resource_type": "secret_v2"
        }"#;
        let secret: Secret = serde_json::from_str(json).unwrap();
        assert_eq!(secret.format, SecretFormat::BasicAuth);
        assert_eq!(secret.keys().collect::<Vec<_>>(), vec!["password", "username"]);
    }

    #[test]
    fn test_unknown_format_maps_to_other() {
        let secret: Secret =
            serde_json::from_str(r#"{"name": "s", "format": "hmac_auth"}"#).unwrap();
        assert_eq!(secret.format, SecretFormat::Other);
        let secret: Secret = serde_json::from_str(r#"{"name": "s", "format": "other"}"#).unwrap();
        assert_eq!(secret.format, SecretFormat::Other);
    }

    #[test]
    fn test_debug_redacts_values() {
        let params = SecretCreateParams::new("p", "db", SecretFormat::Generic)
            .with_entry("password", "hunter2");
        let debug = format!("{params:?}");
        assert!(debug.contains("password"));
        assert!(!debug.contains("hunter2"));

        let secret: Secret =
            serde_json::from_str(r#"{"name": "s", "data": {"token": "abc123"}}"#).unwrap();
        assert!(!format!("{secret:?}").contains("abc123"));
    }

    #[test]
    fn test_create_params_body() {
        let params = SecretCreateParams::new("p", "db", SecretFormat::SshAuth)
            .with_entry("ssh_key", "---KEY---");
        let json = serde_json::to_value(&params).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "name": "db",
                "format": "ssh_auth",
                "data": {"ssh_key": "---KEY---"}
            })
        );
    }
}
