//! List query building blocks shared by the repositories
//!
//! Every list runs the same filter twice: once under `SELECT COUNT(*)` for
//! the pagination total and once for the page itself. Filters are pushed onto
//! a `QueryBuilder` after a `WHERE 1 = 1` so each one starts with `AND`.

use mcat_common::pagination::DEFAULT_PAGE_SIZE;
use mcat_common::{Error, PageRequest, Result, SortOrder};
use sqlx::{QueryBuilder, Sqlite};
use std::collections::HashSet;
use std::hash::Hash;
use std::str::FromStr;
use uuid::Uuid;

/// Most distinct ids one track may link to per relation
///
/// Each id becomes one bound variable in the existence check.
pub const MAX_RELATED_IDS: usize = 100;

/// Allow-listed sort column of one entity
pub trait SortField: Copy + FromStr<Err = Error> {
    /// Sort used when the request names none
    const DEFAULT: Self;
    /// Direction used when the request names none
    const DEFAULT_ORDER: SortOrder;

    /// Qualified SQL column
    fn column(self) -> &'static str;
}

/// Search, sort and page of a list request
#[derive(Debug, Clone)]
pub struct ListParams<S> {
    pub search: Option<String>,
    pub page: PageRequest,
    pub sort: S,
    pub order: SortOrder,
}

impl<S: SortField> Default for ListParams<S> {
    fn default() -> Self {
        Self::new(PageRequest::first(DEFAULT_PAGE_SIZE))
    }
}

impl<S: SortField> ListParams<S> {
    /// Entity defaults for sort and order
    pub fn new(page: PageRequest) -> Self {
        Self {
            search: None,
            page,
            sort: S::DEFAULT,
            order: S::DEFAULT_ORDER,
        }
    }

    pub fn with_search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }

    pub fn sorted(mut self, sort: S, order: SortOrder) -> Self {
        self.sort = sort;
        self.order = order;
        self
    }

    /// Lower-cased search term, `None` when blank
    pub fn search_term(&self) -> Option<String> {
        normalize_search(self.search.as_deref())
    }

    /// `ORDER BY` clause with the id tie-breaker so paging is stable
    pub fn push_order_by(&self, qb: &mut QueryBuilder<'_, Sqlite>, id_column: &str) {
        let order = self.order.as_sql();
        qb.push(format!(
            " ORDER BY {} {}, {} {}",
            self.sort.column(),
            order,
            id_column,
            order
        ));
    }

    pub fn push_limit(&self, qb: &mut QueryBuilder<'_, Sqlite>) {
        push_page(qb, self.page);
    }
}

/// Trim and ASCII-lower-case a search term (SQLite `lower()` folds ASCII only)
pub fn normalize_search(term: Option<&str>) -> Option<String> {
    term.map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_ascii_lowercase)
}

/// `LIMIT ? OFFSET ?`
pub fn push_page(qb: &mut QueryBuilder<'_, Sqlite>, page: PageRequest) {
    qb.push(" LIMIT ")
        .push_bind(page.limit)
        .push(" OFFSET ")
        .push_bind(page.offset());
}

/// Case-insensitive substring test of `column` against an already lower-cased term
///
/// `instr` instead of `LIKE` so `%` and `_` in the term match literally.
pub fn push_contains(qb: &mut QueryBuilder<'_, Sqlite>, column: &str, term: &str) {
    qb.push(format!("instr(lower({}), ", column))
        .push_bind(term.to_string())
        .push(") > 0");
}

/// Collapse repeated ids, keeping first occurrence order
pub fn dedup_ids<T: Eq + Hash + Copy>(ids: &[T]) -> Vec<T> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

/// Distinct related ids, at most `MAX_RELATED_IDS` of them
pub fn related_ids(ids: &[Uuid], field: &str) -> Result<Vec<Uuid>> {
    let unique = dedup_ids(ids);
    if unique.len() > MAX_RELATED_IDS {
        return Err(Error::InvalidInput(format!(
            "{} accepts at most {} ids (got {})",
            field,
            MAX_RELATED_IDS,
            unique.len()
        )));
    }
    Ok(unique)
}

/// Parse an optional sort name against the entity allow-list
pub fn parse_sort<S: SortField>(value: Option<&str>) -> Result<S> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => v.parse(),
        None => Ok(S::DEFAULT),
    }
}

/// Generates the `FromStr` side of a sort enum from its accepted names
macro_rules! sort_names {
    ($ty:ident { $($name:literal => $variant:ident),+ $(,)? }) => {
        impl std::str::FromStr for $ty {
            type Err = mcat_common::Error;

            fn from_str(s: &str) -> mcat_common::Result<Self> {
                match s {
                    $($name => Ok($ty::$variant),)+
                    other => Err(mcat_common::Error::InvalidInput(format!(
                        "sortBy must be one of [{}] (got '{}')",
                        [$($name),+].join(", "),
                        other
                    ))),
                }
            }
        }
    };
}

pub(crate) use sort_names;
