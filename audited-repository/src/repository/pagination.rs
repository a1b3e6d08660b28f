//! Paging contract between callers and repositories
//!
//! A caller describes the page it wants with a [`PagedRequest`] and receives
//! a [`PagedResult`]: one slice of matches plus the total match count.
//!
//! # Example
//!
//! ```rust
//! use audited_repository::repository::{PagedRequest, PagedResult, Pagination};
//!
//! let request = PagedRequest::new()
//!     .with_page(2)
//!     .with_page_size(10)
//!     .with_order_by("name")
//!     .with_search("foo");
//! assert_eq!(request.pagination(), Pagination::new(10, 10));
//!
//! let result = PagedResult::new(vec!["a", "b"], 12, 2, 10);
//! assert_eq!(result.page_count(), 2);
//! ```

use std::collections::BTreeMap;
use std::fmt;

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

use super::error::{RepositoryError, RepositoryOperation};
use super::traits::RepositoryResult;

/// Default number of rows per page
pub const DEFAULT_PAGE_SIZE: u32 = 25;

/// Direction for ordering results
///
/// # Example
///
/// ```rust
/// use audited_repository::repository::OrderDirection;
///
/// assert_eq!(format!("{}", OrderDirection::Ascending), "asc");
/// assert_eq!(OrderDirection::from_descending(true), OrderDirection::Descending);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderDirection {
    /// Sort in ascending order (A-Z, 0-9)
    #[default]
    Ascending,
    /// Sort in descending order (Z-A, 9-0)
    Descending,
}

impl OrderDirection {
    /// Direction for a request's `order_by_descending` flag
    #[must_use]
    pub const fn from_descending(descending: bool) -> Self {
        if descending {
            Self::Descending
        } else {
            Self::Ascending
        }
    }
}

impl fmt::Display for OrderDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ascending => write!(f, "asc"),
            Self::Descending => write!(f, "desc"),
        }
    }
}

/// Offset and limit applied after filtering and ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// Number of results to skip
    pub offset: u64,
    /// Maximum number of results to return
    pub limit: u64,
}

impl Pagination {
    /// Create new pagination parameters
    #[must_use]
    pub const fn new(offset: u64, limit: u64) -> Self {
        Self { offset, limit }
    }

    /// Create pagination for a specific page number (1-indexed)
    ///
    /// # Example
    ///
    /// ```rust
    /// use audited_repository::repository::Pagination;
    ///
    /// let page3 = Pagination::page(3, 20);
    /// assert_eq!(page3.offset, 40);
    /// assert_eq!(page3.limit, 20);
    /// ```
    #[must_use]
    pub const fn page(page_number: u64, page_size: u64) -> Self {
        let offset = page_number.saturating_sub(1).saturating_mul(page_size);
        Self {
            offset,
            limit: page_size,
        }
    }
}

/// One page of a filtered, searched and sorted query
///
/// Deserializes from the camelCase wire shape; omitted fields take their
/// defaults (`page = 1`, `pageSize = 25`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PagedRequest {
    /// Page number, 1-indexed
    pub page: u32,

    /// Rows per page
    pub page_size: u32,

    /// Field to sort by. Unset means ascending by identity.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_by: Option<String>,

    /// Sort descending instead of ascending
    pub order_by_descending: bool,

    /// Case-insensitive text matched against every text field
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_query: Option<String>,

    /// Field name to required substring
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub filters: BTreeMap<String, String>,
}

impl Default for PagedRequest {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            order_by: None,
            order_by_descending: false,
            search_query: None,
            filters: BTreeMap::new(),
        }
    }
}

impl PagedRequest {
    /// Request for the first page with default size
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the page number
    #[must_use]
    pub fn with_page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    /// Set the page size
    #[must_use]
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Sort ascending by `field`
    #[must_use]
    pub fn with_order_by(mut self, field: impl Into<String>) -> Self {
        self.order_by = Some(field.into());
        self
    }

    /// Sort descending instead of ascending
    #[must_use]
    pub fn descending(mut self) -> Self {
        self.order_by_descending = true;
        self
    }

    /// Set the search text
    #[must_use]
    pub fn with_search(mut self, query: impl Into<String>) -> Self {
        self.search_query = Some(query.into());
        self
    }

    /// Require `field` to contain `substring`
    ///
    /// A later filter on the same field replaces the earlier one.
    #[must_use]
    pub fn with_filter(mut self, field: impl Into<String>, substring: impl Into<String>) -> Self {
        self.filters.insert(field.into(), substring.into());
        self
    }

    /// Sort direction implied by `order_by_descending`
    #[must_use]
    pub fn direction(&self) -> OrderDirection {
        OrderDirection::from_descending(self.order_by_descending)
    }

    /// Search text, if any non-empty text was given
    #[must_use]
    pub fn search(&self) -> Option<&str> {
        self.search_query.as_deref().filter(|q| !q.is_empty())
    }

    /// Offset and limit for this page
    #[must_use]
    pub fn pagination(&self) -> Pagination {
        Pagination::page(u64::from(self.page), u64::from(self.page_size))
    }

    /// Reject a page or page size below 1, or a page size above `max_page_size`
    pub fn validate(&self, max_page_size: Option<u32>) -> RepositoryResult<()> {
        if self.page < 1 {
            return Err(RepositoryError::invalid_argument(
                RepositoryOperation::GetPaged,
                format!("page must be at least 1, got {}", self.page),
            ));
        }
        if self.page_size < 1 {
            return Err(RepositoryError::invalid_argument(
                RepositoryOperation::GetPaged,
                format!("pageSize must be at least 1, got {}", self.page_size),
            ));
        }
        if let Some(max) = max_page_size {
            if self.page_size > max {
                return Err(RepositoryError::invalid_argument(
                    RepositoryOperation::GetPaged,
                    format!("pageSize must be at most {}, got {}", max, self.page_size),
                ));
            }
        }
        Ok(())
    }
}

/// One page of matches plus the total match count
///
/// `row_count` counts every match before paging; the page count is derived
/// from it on demand and serialized as `pageCount`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagedResult<T> {
    /// Rows on this page
    pub items: Vec<T>,
    /// Total matches before paging
    pub row_count: u64,
    /// Page number, 1-indexed
    pub current_page: u32,
    /// Requested rows per page
    pub page_size: u32,
}

impl<T: Serialize> Serialize for PagedResult<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("PagedResult", 5)?;
        state.serialize_field("items", &self.items)?;
        state.serialize_field("rowCount", &self.row_count)?;
        state.serialize_field("currentPage", &self.current_page)?;
        state.serialize_field("pageSize", &self.page_size)?;
        state.serialize_field("pageCount", &self.page_count())?;
        state.end()
    }
}

impl<T> PagedResult<T> {
    /// Create a paged result
    pub fn new(items: Vec<T>, row_count: u64, current_page: u32, page_size: u32) -> Self {
        Self {
            items,
            row_count,
            current_page,
            page_size,
        }
    }

    /// Number of pages, rounding up
    ///
    /// # Example
    ///
    /// ```rust
    /// use audited_repository::repository::PagedResult;
    ///
    /// let result: PagedResult<()> = PagedResult::new(Vec::new(), 0, 1, 25);
    /// assert_eq!(result.page_count(), 0);
    ///
    /// let result: PagedResult<()> = PagedResult::new(Vec::new(), 51, 3, 25);
    /// assert_eq!(result.page_count(), 3);
    /// ```
    #[must_use]
    pub fn page_count(&self) -> u32 {
        calculate_page_count(self.row_count, self.page_size)
    }

    /// Whether a page follows this one
    #[must_use]
    pub fn has_next(&self) -> bool {
        self.current_page < self.page_count()
    }

    /// Whether a page precedes this one
    #[must_use]
    pub fn has_previous(&self) -> bool {
        self.current_page > 1
    }

    /// Number of rows on this page
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether this page holds no rows
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Transform every row, keeping the paging metadata
    pub fn map<U, F>(self, f: F) -> PagedResult<U>
    where
        F: FnMut(T) -> U,
    {
        PagedResult {
            items: self.items.into_iter().map(f).collect(),
            row_count: self.row_count,
            current_page: self.current_page,
            page_size: self.page_size,
        }
    }
}

fn calculate_page_count(row_count: u64, page_size: u32) -> u32 {
    if page_size == 0 {
        return 0;
    }
    let page_size = u64::from(page_size);
    let pages = row_count.div_ceil(page_size);
    pages.min(u64::from(u32::MAX)) as u32
}
