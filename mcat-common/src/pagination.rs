//! Pagination utilities shared by every list operation
//!
//! Pages are 1-indexed. Requests past the last page are not clamped: they
//! yield an empty page, so the row count of page `P` with limit `L` is always
//! `max(0, min(L, total - (P - 1) * L))`.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// Default page size for most list operations
pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// Default page size for the genre list
pub const GENRE_PAGE_SIZE: i64 = 20;

/// Largest accepted page size
pub const MAX_PAGE_SIZE: i64 = 100;

/// Validated page request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// Page number (1-indexed)
    pub page: i64,
    /// Rows per page
    pub limit: i64,
}

impl PageRequest {
    /// Validate page and limit
    ///
    /// # Errors
    /// `InvalidInput` if `page < 1` or `limit` is outside `1..=MAX_PAGE_SIZE`.
    pub fn new(page: i64, limit: i64) -> Result<Self> {
        if page < 1 {
            return Err(Error::InvalidInput(format!(
                "page must be at least 1 (got {})",
                page
            )));
        }
        if !(1..=MAX_PAGE_SIZE).contains(&limit) {
            return Err(Error::InvalidInput(format!(
                "limit must be between 1 and {} (got {})",
                MAX_PAGE_SIZE, limit
            )));
        }
        Ok(Self { page, limit })
    }

    /// First page with the given page size
    pub fn first(limit: i64) -> Self {
        Self {
            page: 1,
            limit: limit.clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// Offset for SQL LIMIT/OFFSET query
    ///
    /// Saturates at `i64::MAX`, which still selects an empty page.
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

/// Pagination metadata returned with every list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    /// Total number of matching rows
    pub total: i64,
    /// Requested page number (1-indexed)
    pub page: i64,
    /// Requested page size
    pub limit: i64,
    /// Total number of pages
    pub total_pages: i64,
}

/// Calculate pagination metadata from total results and the page request
///
/// # Examples
/// ```
/// use mcat_common::pagination::{calculate_pagination, PageRequest};
///
/// // 25 total results = 3 pages (10 + 10 + 5)
/// let p = calculate_pagination(25, PageRequest::new(2, 10).unwrap());
/// assert_eq!(p.total_pages, 3);
/// assert_eq!(p.page, 2);
/// ```
pub fn calculate_pagination(total: i64, request: PageRequest) -> Pagination {
    let total_pages = (total + request.limit - 1) / request.limit;

    Pagination {
        total,
        page: request.page,
        limit: request.limit,
        total_pages,
    }
}

/// One page of results plus its pagination metadata
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub pagination: Pagination,
}

impl<T> Page<T> {
    pub fn new(data: Vec<T>, total: i64, request: PageRequest) -> Self {
        Self {
            data,
            pagination: calculate_pagination(total, request),
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    /// SQL keyword for ORDER BY
    pub fn as_sql(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

impl FromStr for SortOrder {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            other => Err(Error::InvalidInput(format!(
                "order must be 'asc' or 'desc' (got '{}')",
                other
            ))),
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        })
    }
}
