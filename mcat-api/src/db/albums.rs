//! Album persistence

use chrono::NaiveDate;
use mcat_common::db::{Album, AlbumDetail, AlbumListItem};
use mcat_common::{time, uuid_utils, Error, Page, Result, SortOrder};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqliteConnection, SqlitePool};
use tracing::info;
use uuid::Uuid;

use super::artists::find_artist;
use super::query::{push_contains, sort_names, ListParams, SortField};
use super::{fetch_count, optional_text, required_text, tracks};

pub(crate) const ALBUM_COLUMNS: &str = "al.guid AS guid, al.title AS title, al.release_date AS release_date, \
     al.cover_url AS cover_url, al.created_at AS created_at, al.updated_at AS updated_at";

const TRACK_COUNT: &str = "(SELECT COUNT(*) FROM tracks tc WHERE tc.album_id = al.guid) AS track_count";

#[derive(Debug, Clone)]
pub struct NewAlbum {
    pub title: String,
    pub release_date: NaiveDate,
    pub cover_url: Option<String>,
}

/// Partial album update; a blank `cover_url` clears the cover
#[derive(Debug, Clone, Default)]
pub struct AlbumUpdate {
    pub title: Option<String>,
    pub release_date: Option<NaiveDate>,
    pub cover_url: Option<String>,
}

impl AlbumUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.release_date.is_none() && self.cover_url.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlbumSort {
    Title,
    ReleaseDate,
    CreatedAt,
    UpdatedAt,
}

sort_names!(AlbumSort {
    "title" => Title,
    "releaseDate" => ReleaseDate,
    "createdAt" => CreatedAt,
    "updatedAt" => UpdatedAt,
});

impl SortField for AlbumSort {
    const DEFAULT: Self = AlbumSort::ReleaseDate;
    const DEFAULT_ORDER: SortOrder = SortOrder::Desc;

    fn column(self) -> &'static str {
        match self {
            AlbumSort::Title => "al.title",
            AlbumSort::ReleaseDate => "al.release_date",
            AlbumSort::CreatedAt => "al.created_at",
            AlbumSort::UpdatedAt => "al.updated_at",
        }
    }
}

pub(crate) fn album_from_row(row: &SqliteRow) -> Result<Album> {
    let guid: String = row.try_get("guid")?;

    Ok(Album {
        id: uuid_utils::parse_guid(&guid)?,
        title: row.try_get("title")?,
        release_date: row.try_get("release_date")?,
        cover_url: row.try_get("cover_url")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn list_item_from_row(row: &SqliteRow) -> Result<AlbumListItem> {
    Ok(AlbumListItem {
        album: album_from_row(row)?,
        track_count: row.try_get("track_count")?,
    })
}

fn not_found(id: Uuid) -> Error {
    Error::NotFound(format!("Album not found: {}", id))
}

pub async fn create_album(pool: &SqlitePool, new: NewAlbum) -> Result<Album> {
    let now = time::now();
    let album = Album {
        id: uuid_utils::generate(),
        title: required_text(&new.title, "title")?,
        release_date: new.release_date,
        cover_url: optional_text(new.cover_url),
        created_at: now,
        updated_at: now,
    };

    sqlx::query(
        r#"
        INSERT INTO albums (guid, title, release_date, cover_url, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(album.id.to_string())
    .bind(&album.title)
    .bind(album.release_date)
    .bind(&album.cover_url)
    .bind(time::to_db(&album.created_at))
    .bind(time::to_db(&album.updated_at))
    .execute(pool)
    .await?;

    info!(album_id = %album.id, title = %album.title, "Created album");
    Ok(album)
}

pub(crate) async fn find_album(conn: &mut SqliteConnection, id: Uuid) -> Result<Option<Album>> {
    let row = sqlx::query(&format!("SELECT {} FROM albums al WHERE al.guid = ?", ALBUM_COLUMNS))
        .bind(id.to_string())
        .fetch_optional(&mut *conn)
        .await?;

    row.as_ref().map(album_from_row).transpose()
}

pub async fn get_album(pool: &SqlitePool, id: Uuid) -> Result<Album> {
    let mut conn = pool.acquire().await?;
    find_album(&mut conn, id).await?.ok_or_else(|| not_found(id))
}

/// Album with all of its tracks, oldest first
pub async fn get_album_detail(pool: &SqlitePool, id: Uuid) -> Result<AlbumDetail> {
    let mut conn = pool.acquire().await?;
    let album = find_album(&mut conn, id).await?.ok_or_else(|| not_found(id))?;

    let mut qb = tracks::select_tracks();
    qb.push(" WHERE t.album_id = ")
        .push_bind(id.to_string())
        .push(" ORDER BY t.created_at ASC, t.guid ASC");
    let tracks = tracks::fetch_tracks(&mut conn, qb).await?;

    Ok(AlbumDetail { album, tracks })
}

/// Search over album title and the titles of its tracks
fn push_filter(qb: &mut QueryBuilder<'_, Sqlite>, term: Option<&str>) {
    if let Some(term) = term {
        qb.push(" AND (");
        push_contains(qb, "al.title", term);
        qb.push(" OR EXISTS (SELECT 1 FROM tracks t WHERE t.album_id = al.guid AND ");
        push_contains(qb, "t.title", term);
        qb.push("))");
    }
}

/// Restrict to albums holding at least one track credited to `artist_id`
fn push_artist_filter(qb: &mut QueryBuilder<'_, Sqlite>, artist_id: Option<Uuid>) {
    if let Some(artist_id) = artist_id {
        qb.push(
            " AND EXISTS (SELECT 1 FROM tracks t JOIN track_artists ta ON ta.track_id = t.guid \
             WHERE t.album_id = al.guid AND ta.artist_id = ",
        )
        .push_bind(artist_id.to_string())
        .push(")");
    }
}

async fn list_filtered(
    conn: &mut SqliteConnection,
    artist_id: Option<Uuid>,
    params: &ListParams<AlbumSort>,
) -> Result<Page<AlbumListItem>> {
    let term = params.search_term();

    let mut count = QueryBuilder::new("SELECT COUNT(*) FROM albums al WHERE 1 = 1");
    push_artist_filter(&mut count, artist_id);
    push_filter(&mut count, term.as_deref());
    let total = fetch_count(conn, count).await?;

    let mut qb = QueryBuilder::new(format!(
        "SELECT {}, {} FROM albums al WHERE 1 = 1",
        ALBUM_COLUMNS, TRACK_COUNT
    ));
    push_artist_filter(&mut qb, artist_id);
    push_filter(&mut qb, term.as_deref());
    params.push_order_by(&mut qb, "al.guid");
    params.push_limit(&mut qb);

    let rows = qb.build().fetch_all(&mut *conn).await?;
    let data = rows
        .iter()
        .map(list_item_from_row)
        .collect::<Result<Vec<_>>>()?;

    Ok(Page::new(data, total, params.page))
}

pub async fn list_albums(pool: &SqlitePool, params: &ListParams<AlbumSort>) -> Result<Page<AlbumListItem>> {
    let mut conn = pool.acquire().await?;
    list_filtered(&mut conn, None, params).await
}

/// Albums reached through the artist's tracks
pub async fn list_albums_by_artist(
    pool: &SqlitePool,
    artist_id: Uuid,
    params: &ListParams<AlbumSort>,
) -> Result<Page<AlbumListItem>> {
    let mut conn = pool.acquire().await?;
    if find_artist(&mut conn, artist_id).await?.is_none() {
        return Err(Error::NotFound(format!("Artist not found: {}", artist_id)));
    }
    list_filtered(&mut conn, Some(artist_id), params).await
}

pub async fn update_album(pool: &SqlitePool, id: Uuid, update: AlbumUpdate) -> Result<Album> {
    if update.is_empty() {
        return Err(Error::InvalidInput("No fields to update".to_string()));
    }

    let mut album = get_album(pool, id).await?;
    if let Some(title) = update.title {
        album.title = required_text(&title, "title")?;
    }
    if let Some(release_date) = update.release_date {
        album.release_date = release_date;
    }
    if let Some(cover_url) = update.cover_url {
        album.cover_url = optional_text(Some(cover_url));
    }
    album.updated_at = time::now();

    let result = sqlx::query(
        "UPDATE albums SET title = ?, release_date = ?, cover_url = ?, updated_at = ? WHERE guid = ?",
    )
    .bind(&album.title)
    .bind(album.release_date)
    .bind(&album.cover_url)
    .bind(time::to_db(&album.updated_at))
    .bind(id.to_string())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(not_found(id));
    }

    info!(album_id = %id, "Updated album");
    Ok(album)
}

/// Delete an album; its tracks stay with `albumId = null`
pub async fn delete_album(pool: &SqlitePool, id: Uuid) -> Result<()> {
    let result = sqlx::query("DELETE FROM albums WHERE guid = ?")
        .bind(id.to_string())
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(not_found(id));
    }

    info!(album_id = %id, "Deleted album");
    Ok(())
}
