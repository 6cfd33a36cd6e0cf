//! Get trait for fetching single entities.

use async_trait::async_trait;

use crate::client::CodeEngineClient;
use crate::error::Result;

/// Fetch a single entity by ID.
///
/// Implement this trait for entity types that can be fetched individually
/// by a unique identifier (a project ID, or a project-scoped name).
///
/// # Example
///
/// ```ignore
/// use codeengine::{CodeEngineClient, App, Get, ResourceId};
///
/// let client = CodeEngineClient::from_env()?;
/// let app = App::get(&client, ResourceId::new("my-project-id", "my-app")).await?;
/// ```
#[async_trait]
pub trait Get: Sized {
    /// The ID type for this entity.
    type Id;

    /// Fetch the entity by ID.
    ///
    /// # Arguments
    ///
    /// * `client` - The Code Engine API client
    /// * `id` - The entity identifier
    ///
    /// # Errors
    ///
    /// Returns [`NotFound`](crate::CodeEngineError::NotFound) if the entity
    /// does not exist, or another error if the request fails.
    async fn get(client: &CodeEngineClient, id: Self::Id) -> Result<Self>;
}
