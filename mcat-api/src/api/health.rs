//! Health check endpoint
//!
//! Answers 200 while the catalog database responds and 503 once it does not.

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::warn;

use crate::AppState;

/// Row counts of the catalog tables
#[derive(Debug, Serialize)]
pub struct CatalogCounts {
    pub artists: i64,
    pub albums: i64,
    pub tracks: i64,
    pub genres: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// "ok" or "unavailable"
    pub status: &'static str,
    pub module: &'static str,
    pub version: &'static str,
    /// Git revision the binary was built from
    pub revision: &'static str,
    pub uptime_seconds: u64,
    /// "ok" or "unreachable"
    pub database: &'static str,
    /// Absent when the database is unreachable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog: Option<CatalogCounts>,
}

async fn catalog_counts(pool: &SqlitePool) -> sqlx::Result<CatalogCounts> {
    let (artists, albums, tracks, genres): (i64, i64, i64, i64) = sqlx::query_as(
        r#"
        SELECT
            (SELECT COUNT(*) FROM artists) AS artists,
            (SELECT COUNT(*) FROM albums) AS albums,
            (SELECT COUNT(*) FROM tracks) AS tracks,
            (SELECT COUNT(*) FROM genres) AS genres
        "#,
    )
    .fetch_one(pool)
    .await?;

    Ok(CatalogCounts {
        artists,
        albums,
        tracks,
        genres,
    })
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let uptime_seconds = Utc::now()
        .signed_duration_since(state.startup_time)
        .num_seconds()
        .max(0) as u64;

    let (code, status, database, catalog) = match catalog_counts(&state.db).await {
        Ok(counts) => (StatusCode::OK, "ok", "ok", Some(counts)),
        Err(e) => {
            warn!(error = %e, "Health check could not reach the database");
            (StatusCode::SERVICE_UNAVAILABLE, "unavailable", "unreachable", None)
        }
    };

    let body = HealthResponse {
        status,
        module: "mcat-api",
        version: env!("CARGO_PKG_VERSION"),
        revision: env!("MCAT_GIT_REV"),
        uptime_seconds,
        database,
        catalog,
    };
    (code, Json(body))
}

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
