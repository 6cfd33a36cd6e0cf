//! Delete trait for removing entities.

use async_trait::async_trait;

use crate::client::CodeEngineClient;
use crate::error::Result;

/// Delete an entity by ID.
///
/// Deletion is asynchronous on the server side: a successful call means the
/// request was accepted, not that the resource is already gone.
#[async_trait]
pub trait Delete: Sized {
    /// The ID type for this entity.
    type Id;

    /// Request deletion of the entity.
    async fn delete(client: &CodeEngineClient, id: Self::Id) -> Result<()>;
}
