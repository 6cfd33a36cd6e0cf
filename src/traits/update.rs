//! Update trait for modifying entities.

use async_trait::async_trait;

use crate::client::CodeEngineClient;
use crate::error::Result;

/// Update an existing entity.
///
/// Updates are guarded by optimistic concurrency: `if_match` must be the
/// entity tag from the most recent read. A stale tag fails with status 412.
///
/// Depending on the entity this is a merge patch (apps, jobs, builds) or a
/// full replacement (config maps, secrets).
///
/// # Example
///
/// ```ignore
/// use codeengine::{App, AppUpdateParams, CodeEngineClient, Get, ResourceId, Update};
///
/// let client = CodeEngineClient::from_env()?;
/// let id = ResourceId::new("my-project-id", "my-app");
/// let app = App::get(&client, id.clone()).await?;
/// let updated = App::update(
///     &client,
///     id,
///     app.entity_tag(),
///     AppUpdateParams {
///         scale_max_instances: Some(5),
///         ..Default::default()
///     },
/// ).await?;
/// ```
#[async_trait]
pub trait Update: Sized {
    /// The ID type for this entity.
    type Id;

    /// Parameters for the update.
    type Params;

    /// Update the entity and return the updated version.
    ///
    /// # Arguments
    ///
    /// * `client` - The Code Engine API client
    /// * `id` - The entity identifier
    /// * `if_match` - Entity tag of the version being modified
    /// * `params` - Update parameters
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not found, the tag is stale, or the
    /// request fails.
    async fn update(
        client: &CodeEngineClient,
        id: Self::Id,
        if_match: &str,
        params: Self::Params,
    ) -> Result<Self>;
}
