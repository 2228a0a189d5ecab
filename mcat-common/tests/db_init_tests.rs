//! Database initialization tests
//!
//! Covers first-run creation, reopening an existing file, and the foreign key
//! rules the repositories rely on.

use mcat_common::db::init::{init_database, init_memory_database, SCHEMA_VERSION};
use sqlx::SqlitePool;
use tempfile::TempDir;

async fn table_names(pool: &SqlitePool) -> Vec<String> {
    sqlx::query_as::<_, (String,)>(
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
    )
    .fetch_all(pool)
    .await
    .unwrap()
    .into_iter()
    .map(|(name,)| name)
    .collect()
}

#[tokio::test]
async fn test_database_creation_when_missing() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("nested").join("mcat.db");

    let pool = init_database(&db_path).await;
    assert!(pool.is_ok(), "Database initialization failed: {:?}", pool.err());
    assert!(db_path.exists(), "Database file was not created");
}

#[tokio::test]
async fn test_database_opens_existing() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("mcat.db");

    let pool1 = init_database(&db_path).await.unwrap();
    sqlx::query(
        "INSERT INTO genres (guid, name, image, created_at, updated_at) VALUES ('g1', 'Jazz', 'img', '2024-01-01', '2024-01-01')",
    )
    .execute(&pool1)
    .await
    .unwrap();
    pool1.close().await;

    let pool2 = init_database(&db_path).await;
    assert!(pool2.is_ok(), "Failed to open existing database: {:?}", pool2.err());

    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM genres")
        .fetch_one(&pool2.unwrap())
        .await
        .unwrap();
    assert_eq!(count, 1, "Reopening must not drop data");
}

#[tokio::test]
async fn test_all_tables_created() {
    let pool = init_memory_database().await.unwrap();

    assert_eq!(
        table_names(&pool).await,
        vec![
            "albums",
            "artists",
            "genres",
            "schema_version",
            "track_artists",
            "track_genres",
            "tracks",
        ]
    );

    let (version,): (i64,) = sqlx::query_as("SELECT MAX(version) FROM schema_version")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(version, SCHEMA_VERSION);
}

#[tokio::test]
async fn test_genre_name_is_unique() {
    let pool = init_memory_database().await.unwrap();

    let insert = "INSERT INTO genres (guid, name, image, created_at, updated_at) VALUES (?, 'Jazz', 'img', '2024-01-01', '2024-01-01')";
    sqlx::query(insert).bind("g1").execute(&pool).await.unwrap();
    let err = sqlx::query(insert).bind("g2").execute(&pool).await.unwrap_err();

    assert!(err.as_database_error().unwrap().is_unique_violation());
}

#[tokio::test]
async fn test_genre_with_tags_cannot_be_deleted_directly() {
    let pool = init_memory_database().await.unwrap();

    sqlx::query("INSERT INTO genres (guid, name, image, created_at, updated_at) VALUES ('g1', 'Jazz', 'img', 'x', 'x')")
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query("INSERT INTO tracks (guid, title, audio_url, created_at, updated_at) VALUES ('t1', 'So What', 'a.mp3', 'x', 'x')")
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query("INSERT INTO track_genres (guid, track_id, genre_id, created_at) VALUES ('tg1', 't1', 'g1', 'x')")
        .execute(&pool)
        .await
        .unwrap();

    // RESTRICT keeps the join table free of orphans
    let result = sqlx::query("DELETE FROM genres WHERE guid = 'g1'").execute(&pool).await;
    assert!(result.is_err());

    // Deleting the track cascades to its tags
    sqlx::query("DELETE FROM tracks WHERE guid = 't1'").execute(&pool).await.unwrap();
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM track_genres")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
async fn test_album_delete_detaches_tracks() {
    let pool = init_memory_database().await.unwrap();

    sqlx::query("INSERT INTO albums (guid, title, release_date, created_at, updated_at) VALUES ('a1', 'Blue', '1959-08-17', 'x', 'x')")
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query("INSERT INTO tracks (guid, title, audio_url, album_id, created_at, updated_at) VALUES ('t1', 'So What', 'a.mp3', 'a1', 'x', 'x')")
        .execute(&pool)
        .await
        .unwrap();

    sqlx::query("DELETE FROM albums WHERE guid = 'a1'").execute(&pool).await.unwrap();

    let (album_id,): (Option<String>,) = sqlx::query_as("SELECT album_id FROM tracks WHERE guid = 't1'")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert!(album_id.is_none());
}
