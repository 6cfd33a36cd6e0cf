//! Types shared by several resources.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

use crate::client::resource_path;
use crate::error::{require, Result};

/// Address of a project-scoped resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceId {
    /// ID of the owning project.
    pub project_id: String,
    /// Resource name, unique within the project and resource kind.
    pub name: String,
}

impl ResourceId {
    pub fn new(project_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            name: name.into(),
        }
    }

    /// Request path below `projects/{project_id}/{collection}/`.
    pub(crate) fn path(&self, collection: &str) -> Result<String> {
        require("project_id", &self.project_id)?;
        require("name", &self.name)?;
        Ok(resource_path(&[
            "projects",
            &self.project_id,
            collection,
            &self.name,
        ]))
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.project_id, self.name)
    }
}

/// Path of a project's collection, e.g. `projects/{id}/apps`.
pub(crate) fn collection_path(project_id: &str, collection: &str) -> Result<String> {
    require("project_id", project_id)?;
    Ok(resource_path(&["projects", project_id, collection]))
}

/// Where an environment variable takes its value from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvVarType {
    /// A literal `value`.
    Literal,
    /// Every key of a config map, optionally prefixed.
    ConfigMapFullReference,
    /// Every key of a secret, optionally prefixed.
    SecretFullReference,
    /// A single key of a config map.
    ConfigMapKeyReference,
    /// A single key of a secret.
    SecretKeyReference,
}

/// An environment variable set on an app, job or run.
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvVar {
    #[serde(rename = "type")]
    pub env_type: EnvVarType,
    /// Variable name (literal and key references).
    #[serde(default)]
    pub name: Option<String>,
    /// Literal value.
    #[serde(default)]
    pub value: Option<String>,
    /// Name of the referenced config map or secret.
    #[serde(default)]
    pub reference: Option<String>,
    /// Key inside the referenced config map or secret.
    #[serde(default)]
    pub key: Option<String>,
    /// Prefix for full references.
    #[serde(default)]
    pub prefix: Option<String>,
}

impl EnvVar {
    /// A literal `name=value` variable.
    pub fn literal(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            env_type: EnvVarType::Literal,
            name: Some(name.into()),
            value: Some(value.into()),
            reference: None,
            key: None,
            prefix: None,
        }
    }

    /// Expose every key of a config map as a variable.
    pub fn config_map(reference: impl Into<String>) -> Self {
        Self {
            env_type: EnvVarType::ConfigMapFullReference,
            name: None,
            value: None,
            reference: Some(reference.into()),
            key: None,
            prefix: None,
        }
    }

    /// Expose one key of a secret as the variable `name`.
    pub fn secret_key(
        name: impl Into<String>,
        reference: impl Into<String>,
        key: impl Into<String>,
    ) -> Self {
        Self {
            env_type: EnvVarType::SecretKeyReference,
            name: Some(name.into()),
            value: None,
            reference: Some(reference.into()),
            key: Some(key.into()),
            prefix: None,
        }
    }
}

/// Kind of object mounted as a volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeMountType {
    ConfigMap,
    Secret,
}

/// A config map or secret mounted into the container filesystem.
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeMount {
    pub mount_path: String,
    /// Name of the referenced config map or secret.
    pub reference: String,
    #[serde(rename = "type")]
    pub mount_type: VolumeMountType,
    /// Mount name; generated by the server when omitted.
    #[serde(default)]
    pub name: Option<String>,
}

/// A liveness or readiness probe.
#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Probe {
    /// `tcp` or `http`.
    #[serde(rename = "type", default)]
    pub probe_type: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub initial_delay: Option<u32>,
    #[serde(default)]
    pub interval: Option<u32>,
    #[serde(default)]
    pub timeout: Option<u32>,
    #[serde(default)]
    pub failure_threshold: Option<u32>,
}
