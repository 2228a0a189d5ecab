//! Repository layer
//!
//! Free async functions over the pool. Multi-step writes run in one
//! transaction; helpers that take `&mut SqliteConnection` work both on a
//! pooled connection and inside a transaction.

pub mod albums;
pub mod artists;
pub mod genres;
pub mod query;
pub mod tracks;

pub use query::{ListParams, SortField};

use mcat_common::{Error, Result};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};
use std::collections::HashSet;
use uuid::Uuid;

/// Trimmed value of a required text field
pub(crate) fn required_text(value: &str, field: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidInput(format!("{} is required", field)));
    }
    Ok(trimmed.to_string())
}

/// Trimmed optional text; blank becomes `None`
pub(crate) fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub(crate) fn validate_duration(duration: Option<i64>) -> Result<()> {
    match duration {
        Some(d) if d < 0 => Err(Error::InvalidInput(format!(
            "duration must not be negative (got {})",
            d
        ))),
        _ => Ok(()),
    }
}

/// Ids from `ids` that have no row in `table`, in input order
///
/// `table` is always one of the catalog tables named by the caller.
pub(crate) async fn missing_ids(
    conn: &mut SqliteConnection,
    table: &'static str,
    ids: &[Uuid],
) -> Result<Vec<Uuid>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT guid FROM {} WHERE guid IN (", table));
    let mut separated = qb.separated(", ");
    for id in ids {
        separated.push_bind(id.to_string());
    }
    separated.push_unseparated(")");

    let found: HashSet<String> = qb
        .build_query_scalar::<String>()
        .fetch_all(&mut *conn)
        .await?
        .into_iter()
        .collect();

    Ok(ids
        .iter()
        .filter(|id| !found.contains(&id.to_string()))
        .copied()
        .collect())
}

/// `"a, b, c"` for error messages
pub(crate) fn join_ids(ids: &[Uuid]) -> String {
    ids.iter()
        .map(Uuid::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Total for a list query
pub(crate) async fn fetch_count(
    conn: &mut SqliteConnection,
    mut qb: QueryBuilder<'_, Sqlite>,
) -> Result<i64> {
    let total: i64 = qb.build_query_scalar().fetch_one(&mut *conn).await?;
    Ok(total)
}
