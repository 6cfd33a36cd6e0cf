//! Create trait for provisioning new entities.

use async_trait::async_trait;

use crate::client::CodeEngineClient;
use crate::error::Result;

/// Create a new entity.
///
/// The parameters carry everything needed to address the new entity,
/// including the owning project for project-scoped resources.
///
/// # Example
///
/// ```ignore
/// use codeengine::{CodeEngineClient, ConfigMap, ConfigMapCreateParams, Create};
///
/// let client = CodeEngineClient::from_env()?;
/// let config_map = ConfigMap::create(
///     &client,
///     ConfigMapCreateParams::new("my-project-id", "settings")
///         .with_entry("LOG_LEVEL", "debug"),
/// ).await?;
/// ```
#[async_trait]
pub trait Create: Sized {
    /// Parameters for the new entity.
    type Params: Send;

    /// Create the entity and return it as stored by the server.
    async fn create(client: &CodeEngineClient, params: Self::Params) -> Result<Self>;
}
