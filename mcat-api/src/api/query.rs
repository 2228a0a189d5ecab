//! List query-string parameters
//!
//! Every parameter is read as a string and validated here, so a malformed
//! `page` or an unknown `sortBy` answers with the JSON error body instead of
//! the framework's plain-text rejection.

use axum::async_trait;
use axum::extract::{FromRequestParts, Query};
use axum::http::request::Parts;
use mcat_common::pagination::DEFAULT_PAGE_SIZE;
use mcat_common::{Error, PageRequest, Result, SortOrder};
use serde::Deserialize;

use crate::db::query::{normalize_search, parse_sort};
use crate::db::tracks::SearchScope;
use crate::db::{ListParams, SortField};
use crate::error::ApiError;

/// `?query=&page=&limit=&sortBy=&order=&searchBy=`
///
/// `search` is accepted as another name for `query`; `query` wins when both
/// are sent.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub query: Option<String>,
    pub search: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
    pub sort_by: Option<String>,
    pub order: Option<String>,
    pub search_by: Option<String>,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn parse_number(value: Option<&str>, name: &str, default: i64) -> Result<i64> {
    match value {
        Some(v) => v.parse::<i64>().map_err(|_| {
            Error::InvalidInput(format!("{} must be an integer (got '{}')", name, v))
        }),
        None => Ok(default),
    }
}

impl ListQuery {
    fn search_term(&self) -> Option<String> {
        normalize_search(self.query.as_deref()).or_else(|| normalize_search(self.search.as_deref()))
    }

    /// Validated page request with the given default page size
    pub fn page_request(&self, default_limit: i64) -> Result<PageRequest> {
        let page = parse_number(present(&self.page), "page", 1)?;
        let limit = parse_number(present(&self.limit), "limit", default_limit)?;
        PageRequest::new(page, limit)
    }

    /// List parameters with the entity's default sort
    pub fn to_params<S: SortField>(&self) -> Result<ListParams<S>> {
        self.to_params_with(DEFAULT_PAGE_SIZE, S::DEFAULT, S::DEFAULT_ORDER)
    }

    /// List parameters with explicit defaults
    pub fn to_params_with<S: SortField>(
        &self,
        default_limit: i64,
        default_sort: S,
        default_order: SortOrder,
    ) -> Result<ListParams<S>> {
        let sort = match present(&self.sort_by) {
            Some(name) => parse_sort::<S>(Some(name))?,
            None => default_sort,
        };
        let order = match present(&self.order) {
            Some(order) => order.parse()?,
            None => default_order,
        };

        Ok(ListParams {
            search: self.search_term(),
            page: self.page_request(default_limit)?,
            sort,
            order,
        })
    }

    /// Track search scope, `all` when absent
    pub fn search_scope(&self) -> Result<SearchScope> {
        match present(&self.search_by) {
            Some(scope) => scope.parse(),
            None => Ok(SearchScope::default()),
        }
    }

    /// Search term of the dedicated search endpoints
    pub fn required_search(&self) -> Result<String> {
        self.search_term()
            .ok_or_else(|| Error::InvalidInput("query is required".to_string()))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for ListQuery
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> std::result::Result<Self, Self::Rejection> {
        let Query(query) = Query::<ListQuery>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;
        Ok(query)
    }
}
