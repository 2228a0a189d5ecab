//! Genre persistence and track tagging

use mcat_common::db::{Genre, GenreDetail, GenreListItem, Track, TrackGenreDetail};
use mcat_common::{time, uuid_utils, Error, Page, Result, SortOrder};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqliteConnection, SqlitePool};
use tracing::info;
use uuid::Uuid;

use super::query::{push_contains, sort_names, ListParams, SortField};
use super::tracks::{self, SearchScope, TrackFilter, TrackSort};
use super::{fetch_count, required_text};

const GENRE_COLUMNS: &str = "g.guid AS guid, g.name AS name, g.image AS image, \
     g.created_at AS created_at, g.updated_at AS updated_at";

const TRACK_COUNT: &str = "(SELECT COUNT(*) FROM track_genres tc WHERE tc.genre_id = g.guid) AS track_count";

const DUPLICATE_NAME: &str = "Genre already exists";

#[derive(Debug, Clone, Default)]
pub struct NewGenre {
    pub name: String,
    pub image: String,
}

#[derive(Debug, Clone, Default)]
pub struct GenreUpdate {
    pub name: Option<String>,
    pub image: Option<String>,
}

impl GenreUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.image.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenreSort {
    Name,
    CreatedAt,
    UpdatedAt,
}

sort_names!(GenreSort {
    "name" => Name,
    "createdAt" => CreatedAt,
    "updatedAt" => UpdatedAt,
});

impl SortField for GenreSort {
    const DEFAULT: Self = GenreSort::Name;
    const DEFAULT_ORDER: SortOrder = SortOrder::Asc;

    fn column(self) -> &'static str {
        match self {
            GenreSort::Name => "g.name",
            GenreSort::CreatedAt => "g.created_at",
            GenreSort::UpdatedAt => "g.updated_at",
        }
    }
}

fn genre_from_row(row: &SqliteRow) -> Result<Genre> {
    let guid: String = row.try_get("guid")?;

    Ok(Genre {
        id: uuid_utils::parse_guid(&guid)?,
        name: row.try_get("name")?,
        image: row.try_get("image")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn not_found(id: Uuid) -> Error {
    Error::NotFound(format!("Genre not found: {}", id))
}

async fn find_genre(conn: &mut SqliteConnection, id: Uuid) -> Result<Option<Genre>> {
    let row = sqlx::query(&format!("SELECT {} FROM genres g WHERE g.guid = ?", GENRE_COLUMNS))
        .bind(id.to_string())
        .fetch_optional(&mut *conn)
        .await?;

    row.as_ref().map(genre_from_row).transpose()
}

/// True when a genre other than `except` is called exactly `name` (case-sensitive)
async fn name_taken(pool: &SqlitePool, name: &str, except: Option<Uuid>) -> Result<bool> {
    let taken: Option<String> = sqlx::query_scalar("SELECT guid FROM genres WHERE name = ? AND guid <> ?")
        .bind(name)
        .bind(except.map(|id| id.to_string()).unwrap_or_default())
        .fetch_optional(pool)
        .await?;

    Ok(taken.is_some())
}

/// Insert a genre; names are unique
pub async fn create_genre(pool: &SqlitePool, new: NewGenre) -> Result<Genre> {
    let name = required_text(&new.name, "name")?;
    let image = required_text(&new.image, "image")?;

    if name_taken(pool, &name, None).await? {
        return Err(Error::Conflict(DUPLICATE_NAME.to_string()));
    }

    let now = time::now();
    let genre = Genre {
        id: uuid_utils::generate(),
        name,
        image,
        created_at: now,
        updated_at: now,
    };

    sqlx::query(
        r#"
        INSERT INTO genres (guid, name, image, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(genre.id.to_string())
    .bind(&genre.name)
    .bind(&genre.image)
    .bind(time::to_db(&genre.created_at))
    .bind(time::to_db(&genre.updated_at))
    .execute(pool)
    .await
    .map_err(|e| Error::conflict_on_unique(e, DUPLICATE_NAME))?;

    info!(genre_id = %genre.id, name = %genre.name, "Created genre");
    Ok(genre)
}

pub async fn get_genre(pool: &SqlitePool, id: Uuid) -> Result<Genre> {
    let mut conn = pool.acquire().await?;
    find_genre(&mut conn, id).await?.ok_or_else(|| not_found(id))
}

/// Genre with its track count and tracks (by title)
pub async fn get_genre_detail(pool: &SqlitePool, id: Uuid) -> Result<GenreDetail> {
    let mut conn = pool.acquire().await?;
    let genre = find_genre(&mut conn, id).await?.ok_or_else(|| not_found(id))?;

    let mut qb = tracks::select_tracks();
    qb.push(" WHERE EXISTS (SELECT 1 FROM track_genres tg WHERE tg.track_id = t.guid AND tg.genre_id = ")
        .push_bind(id.to_string())
        .push(") ORDER BY t.title ASC, t.guid ASC");
    let tracks = tracks::fetch_tracks(&mut conn, qb).await?;

    Ok(GenreDetail {
        genre,
        track_count: tracks.len() as i64,
        tracks,
    })
}

fn push_filter(qb: &mut QueryBuilder<'_, Sqlite>, term: Option<&str>) {
    if let Some(term) = term {
        qb.push(" AND ");
        push_contains(qb, "g.name", term);
    }
}

/// One page of genres with their track counts
pub async fn list_genres(pool: &SqlitePool, params: &ListParams<GenreSort>) -> Result<Page<GenreListItem>> {
    let term = params.search_term();
    let mut conn = pool.acquire().await?;

    let mut count = QueryBuilder::new("SELECT COUNT(*) FROM genres g WHERE 1 = 1");
    push_filter(&mut count, term.as_deref());
    let total = fetch_count(&mut conn, count).await?;

    let mut qb = QueryBuilder::new(format!(
        "SELECT {}, {} FROM genres g WHERE 1 = 1",
        GENRE_COLUMNS, TRACK_COUNT
    ));
    push_filter(&mut qb, term.as_deref());
    params.push_order_by(&mut qb, "g.guid");
    params.push_limit(&mut qb);

    let rows = qb.build().fetch_all(&mut *conn).await?;
    let data = rows
        .iter()
        .map(|row| {
            Ok(GenreListItem {
                genre: genre_from_row(row)?,
                track_count: row.try_get("track_count")?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Page::new(data, total, params.page))
}

/// Partial update; renaming onto another genre's name is `Conflict`
pub async fn update_genre(pool: &SqlitePool, id: Uuid, update: GenreUpdate) -> Result<Genre> {
    if update.is_empty() {
        return Err(Error::InvalidInput("No fields to update".to_string()));
    }

    let mut genre = get_genre(pool, id).await?;
    if let Some(name) = update.name {
        let name = required_text(&name, "name")?;
        if name_taken(pool, &name, Some(id)).await? {
            return Err(Error::Conflict(DUPLICATE_NAME.to_string()));
        }
        genre.name = name;
    }
    if let Some(image) = update.image {
        genre.image = required_text(&image, "image")?;
    }
    genre.updated_at = time::now();

    let result = sqlx::query("UPDATE genres SET name = ?, image = ?, updated_at = ? WHERE guid = ?")
        .bind(&genre.name)
        .bind(&genre.image)
        .bind(time::to_db(&genre.updated_at))
        .bind(id.to_string())
        .execute(pool)
        .await
        .map_err(|e| Error::conflict_on_unique(e, DUPLICATE_NAME))?;

    if result.rows_affected() == 0 {
        return Err(not_found(id));
    }

    info!(genre_id = %id, "Updated genre");
    Ok(genre)
}

/// Delete a genre and every tag referencing it, in one transaction
pub async fn delete_genre(pool: &SqlitePool, id: Uuid) -> Result<()> {
    let mut tx = pool.begin().await?;

    let untagged = sqlx::query("DELETE FROM track_genres WHERE genre_id = ?")
        .bind(id.to_string())
        .execute(&mut *tx)
        .await?
        .rows_affected();

    let deleted = sqlx::query("DELETE FROM genres WHERE guid = ?")
        .bind(id.to_string())
        .execute(&mut *tx)
        .await?
        .rows_affected();

    if deleted == 0 {
        return Err(not_found(id));
    }

    tx.commit().await?;

    info!(genre_id = %id, untagged, "Deleted genre");
    Ok(())
}

/// Tag a track with a genre
///
/// Track and genre are looked up concurrently; either missing is `NotFound`,
/// an existing tag is `Conflict`.
pub async fn tag_track(pool: &SqlitePool, track_id: Uuid, genre_id: Uuid) -> Result<TrackGenreDetail> {
    let (_, genre) = tokio::try_join!(
        tracks::get_track(pool, track_id),
        get_genre(pool, genre_id)
    )?;

    let id = uuid_utils::generate();
    let created_at = time::now();

    sqlx::query(
        r#"
        INSERT INTO track_genres (guid, track_id, genre_id, created_at)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(track_id.to_string())
    .bind(genre_id.to_string())
    .bind(time::to_db(&created_at))
    .execute(pool)
    .await
    .map_err(|e| Error::conflict_on_unique(e, "Track is already tagged with this genre"))?;

    // Reload so the returned track lists the new genre
    let track: Track = tracks::get_track(pool, track_id).await?;

    info!(track_id = %track_id, genre_id = %genre_id, "Tagged track");
    Ok(TrackGenreDetail {
        id,
        track_id,
        genre_id,
        created_at,
        track,
        genre,
    })
}

/// Remove a tag
pub async fn untag_track(pool: &SqlitePool, genre_id: Uuid, track_id: Uuid) -> Result<()> {
    let result = sqlx::query("DELETE FROM track_genres WHERE track_id = ? AND genre_id = ?")
        .bind(track_id.to_string())
        .bind(genre_id.to_string())
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!(
            "Track {} is not tagged with genre {}",
            track_id, genre_id
        )));
    }

    info!(track_id = %track_id, genre_id = %genre_id, "Untagged track");
    Ok(())
}

/// Tracks of one genre; the search term matches track titles
pub async fn list_genre_tracks(
    pool: &SqlitePool,
    genre_id: Uuid,
    params: &ListParams<TrackSort>,
) -> Result<Page<Track>> {
    let mut conn = pool.acquire().await?;
    if find_genre(&mut conn, genre_id).await?.is_none() {
        return Err(not_found(genre_id));
    }

    let filter = TrackFilter::by_genre(genre_id).with_scope(SearchScope::Title);
    tracks::list_tracks_on(&mut conn, &filter, params).await
}
