//! Pagination utilities for Code Engine API responses.
//!
//! Collections are paged with an opaque cursor: every list response carries
//! a `next` link whose `start` value is passed back to fetch the following
//! page. The last page has no `next` link.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::client::CodeEngineClient;
use crate::error::{CodeEngineError, Result};
use crate::traits::List;

/// Largest page size accepted by the API.
pub const MAX_PAGE_SIZE: u32 = 100;

/// A `first`/`next` link in a list response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageLink {
    /// Absolute URL of the page.
    #[serde(default)]
    pub href: Option<String>,
    /// Cursor for the page (only present on `next`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
}

impl PageLink {
    /// The cursor of this link, read from `start` or else from the `href` query.
    pub fn cursor(&self) -> Option<String> {
        if let Some(start) = self.start.as_deref().filter(|s| !s.is_empty()) {
            return Some(start.to_string());
        }
        let href = Url::parse(self.href.as_deref()?).ok()?;
        href.query_pairs()
            .find(|(k, _)| k == "start")
            .map(|(_, v)| v.into_owned())
            .filter(|v| !v.is_empty())
    }
}

/// A page of results from the Code Engine API.
#[derive(Debug, Clone, Serialize)]
#[serde(bound = "T: Serialize")]
pub struct Page<T> {
    /// The items on this page.
    pub items: Vec<T>,
    /// Page size the server applied.
    pub limit: u32,
    /// Cursor of the next page, if any.
    pub next_start: Option<String>,
    /// Whether there are more pages.
    pub has_more: bool,
}

impl<T> Page<T> {
    /// Create a page from items and the response's `next` link.
    #[must_use]
    pub fn new(items: Vec<T>, limit: u32, next: Option<&PageLink>) -> Self {
        let next_start = next.and_then(PageLink::cursor);
        Self {
            items,
            limit,
            has_more: next_start.is_some(),
            next_start,
        }
    }

    /// Map the items to a different type.
    #[must_use]
    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            limit: self.limit,
            next_start: self.next_start,
            has_more: self.has_more,
        }
    }

    /// Returns true if this page has no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns the number of items on this page.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns an iterator over the items in this page.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }
}

impl<T> IntoIterator for Page<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a Page<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// Query parameters for paginated requests.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaginationParams {
    /// Maximum number of items per page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    /// Cursor returned by the previous page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
}

impl PaginationParams {
    /// Create pagination params for a specific cursor.
    #[must_use]
    pub fn new(start: Option<&str>, limit: u32) -> Self {
        Self {
            limit: Some(limit),
            start: start.map(str::to_string),
        }
    }
}

/// `limit`/`start` plus an optional parent-name filter such as `job_name`.
#[derive(Debug, Clone)]
pub(crate) struct FilteredPageParams<'a> {
    limit: u32,
    start: Option<&'a str>,
    filter_key: &'static str,
    filter_value: Option<&'a str>,
}

impl<'a> FilteredPageParams<'a> {
    pub(crate) fn new(
        start: Option<&'a str>,
        limit: u32,
        filter_key: &'static str,
        filter_value: Option<&'a str>,
    ) -> Self {
        Self {
            limit,
            start,
            filter_key,
            filter_value: filter_value.filter(|v| !v.is_empty()),
        }
    }

    /// Query pairs in request order.
    pub(crate) fn pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("limit", self.limit.to_string())];
        if let Some(start) = self.start {
            pairs.push(("start", start.to_string()));
        }
        if let Some(value) = self.filter_value {
            pairs.push((self.filter_key, value.to_string()));
        }
        pairs
    }
}

/// Walks a collection one page at a time.
///
/// # Example
///
/// ```no_run
/// use codeengine::{App, AppListQuery, CodeEngineClient, Pager};
///
/// # async fn example() -> codeengine::Result<()> {
/// let client = CodeEngineClient::from_env()?;
/// let mut pager = Pager::<App>::new(&client, AppListQuery::for_project("my-project-id"));
/// while pager.has_next() {
///     for app in pager.get_next().await? {
///         println!("{}", app.name);
///     }
/// }
/// # Ok(())
/// # }
/// ```
pub struct Pager<T: List> {
    client: CodeEngineClient,
    query: T::Query,
    limit: u32,
    next_start: Option<String>,
    has_next: bool,
}

impl<T: List> std::fmt::Debug for Pager<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pager")
            .field("limit", &self.limit)
            .field("next_start", &self.next_start)
            .field("has_next", &self.has_next)
            .finish_non_exhaustive()
    }
}

impl<T: List> Pager<T> {
    /// Create a pager using the largest page size.
    pub fn new(client: &CodeEngineClient, query: T::Query) -> Self {
        Self::with_limit(client, query, MAX_PAGE_SIZE)
    }

    /// Create a pager with an explicit page size (clamped to 1..=100).
    pub fn with_limit(client: &CodeEngineClient, query: T::Query, limit: u32) -> Self {
        Self {
            client: client.clone(),
            query,
            limit: limit.clamp(1, MAX_PAGE_SIZE),
            next_start: None,
            has_next: true,
        }
    }

    /// Whether another page can be fetched.
    pub fn has_next(&self) -> bool {
        self.has_next
    }

    /// Fetch the next page.
    ///
    /// # Errors
    ///
    /// Returns [`CodeEngineError::InvalidArgument`] once the collection is
    /// exhausted, or the error of the underlying request.
    pub async fn get_next(&mut self) -> Result<Vec<T>> {
        if !self.has_next {
            return Err(CodeEngineError::InvalidArgument(
                "no more results available".to_string(),
            ));
        }

        let page =
            T::list_page(&self.client, &self.query, self.next_start.as_deref(), self.limit)
                .await?;

        self.next_start = page.next_start;
        self.has_next = self.next_start.is_some();
        Ok(page.items)
    }

    /// Fetch every remaining page.
    pub async fn get_all(&mut self) -> Result<Vec<T>> {
        let mut all_items = Vec::new();
        while self.has_next {
            all_items.extend(self.get_next().await?);
        }
        Ok(all_items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_has_more_with_next_start() {
        let next = PageLink {
            href: Some("https://api.example.com/v2/projects?limit=2&start=abc".to_string()),
            start: Some("abc".to_string()),
        };
        let page: Page<i32> = Page::new(vec![1, 2], 2, Some(&next));
        assert!(page.has_more);
        assert_eq!(page.next_start.as_deref(), Some("abc"));
    }

    #[test]
    fn test_page_without_next_is_last() {
        let page: Page<i32> = Page::new(vec![1], 50, None);
        assert!(!page.has_more);
        assert!(page.next_start.is_none());
    }

    #[test]
    fn test_cursor_from_href_when_start_missing() {
        let next = PageLink {
            href: Some(
                "https://api.example.com/v2/projects?limit=2&start=eyJrIjoxfQ%3D%3D".to_string(),
            ),
            start: None,
        };
        assert_eq!(next.cursor().as_deref(), Some("eyJrIjoxfQ=="));
    }

    #[test]
    fn test_empty_cursor_means_no_next() {
        let next = PageLink {
            href: Some("https://api.example.com/v2/projects?limit=2".to_string()),
            start: Some(String::new()),
        };
        assert!(next.cursor().is_none());
        let page: Page<i32> = Page::new(vec![], 2, Some(&next));
        assert!(!page.has_more);
    }

    #[test]
    fn test_page_map() {
        let page = Page::new(vec![1, 2, 3], 100, None);
        let mapped = page.map(|x| x * 2);
        assert_eq!(mapped.items, vec![2, 4, 6]);
        assert_eq!(mapped.limit, 100);
    }

    #[test]
    fn test_filtered_page_params_pairs() {
        let params = FilteredPageParams::new(Some("abc"), 10, "job_name", Some("my-job"));
        assert_eq!(
            params.pairs(),
            vec![
                ("limit", "10".to_string()),
                ("start", "abc".to_string()),
                ("job_name", "my-job".to_string()),
            ]
        );

        let params = FilteredPageParams::new(None, 50, "build_name", Some(""));
        assert_eq!(params.pairs(), vec![("limit", "50".to_string())]);
    }

    #[test]
    fn test_pagination_params_serialize() {
        let params = PaginationParams::new(Some("cur"), 10);
        let qs = serde_qs::to_string(&params).unwrap();
        assert!(qs.contains("limit=10"));
        assert!(qs.contains("start=cur"));

        let qs = serde_qs::to_string(&PaginationParams::default()).unwrap();
        assert!(qs.is_empty());
    }
}
