//! List trait for fetching collections of entities.

use async_trait::async_trait;

use crate::client::CodeEngineClient;
use crate::error::Result;
use crate::pagination::{Page, MAX_PAGE_SIZE};

/// Default page size for list operations.
pub const DEFAULT_PAGE_SIZE: u32 = MAX_PAGE_SIZE;

/// Maximum pages to fetch (safety limit).
const MAX_PAGES: u32 = 1000;

/// List entities with cursor pagination.
///
/// # Example
///
/// ```ignore
/// use codeengine::{CodeEngineClient, Project, List};
///
/// let client = CodeEngineClient::from_env()?;
///
/// // Fetch a single page
/// let page = Project::list_page(&client, &Default::default(), None, 50).await?;
///
/// // Continue from where it stopped
/// if let Some(start) = page.next_start.as_deref() {
///     let more = Project::list_page(&client, &Default::default(), Some(start), 50).await?;
/// }
///
/// // Fetch all pages
/// let all_projects = Project::list_all(&client, &Default::default()).await?;
/// ```
#[async_trait]
pub trait List: Sized + Send {
    /// Query parameters: the parent scope plus any filters.
    type Query: Default + Send + Sync;

    /// List entities matching the query (single page).
    ///
    /// # Arguments
    ///
    /// * `client` - The Code Engine API client
    /// * `query` - Parent scope and filters
    /// * `start` - Cursor from the previous page, `None` for the first page
    /// * `limit` - Number of items per page (max 100)
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    async fn list_page(
        client: &CodeEngineClient,
        query: &Self::Query,
        start: Option<&str>,
        limit: u32,
    ) -> Result<Page<Self>>;

    /// List all entities matching the query (fetches all pages).
    ///
    /// Follows the `next` cursor until the server stops returning one.
    ///
    /// # Errors
    ///
    /// Returns an error if any page request fails.
    async fn list_all(client: &CodeEngineClient, query: &Self::Query) -> Result<Vec<Self>> {
        let mut all_items = Vec::new();
        let mut start: Option<String> = None;
        let mut pages = 0;

        loop {
            let result = Self::list_page(client, query, start.as_deref(), DEFAULT_PAGE_SIZE).await?;
            all_items.extend(result.items);
            pages += 1;

            match result.next_start {
                Some(next) if result.has_more => start = Some(next),
                _ => break,
            }

            // Safety limit to prevent infinite loops
            if pages >= MAX_PAGES {
                tracing::warn!(
                    "Reached pagination limit of {} pages, stopping",
                    MAX_PAGES
                );
                break;
            }
        }

        Ok(all_items)
    }
}
