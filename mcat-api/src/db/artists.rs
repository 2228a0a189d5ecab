//! Artist persistence

use mcat_common::db::{Artist, ArtistDetail, ArtistListItem};
use mcat_common::{time, uuid_utils, Error, Page, Result, SortOrder};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqliteConnection, SqlitePool};
use tracing::info;
use uuid::Uuid;

use super::query::{push_contains, sort_names, ListParams, SortField};
use super::{albums, fetch_count, optional_text, required_text, tracks};

pub(crate) const ARTIST_COLUMNS: &str = "a.guid AS guid, a.name AS name, a.bio AS bio, a.image AS image, \
     a.created_at AS created_at, a.updated_at AS updated_at";

/// Fields of a new artist
#[derive(Debug, Clone, Default)]
pub struct NewArtist {
    pub name: String,
    pub bio: Option<String>,
    pub image: Option<String>,
}

/// Partial artist update; blank `bio`/`image` clear the field
#[derive(Debug, Clone, Default)]
pub struct ArtistUpdate {
    pub name: Option<String>,
    pub bio: Option<String>,
    pub image: Option<String>,
}

impl ArtistUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.bio.is_none() && self.image.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtistSort {
    Name,
    CreatedAt,
    UpdatedAt,
}

sort_names!(ArtistSort {
    "name" => Name,
    "createdAt" => CreatedAt,
    "updatedAt" => UpdatedAt,
});

impl SortField for ArtistSort {
    const DEFAULT: Self = ArtistSort::Name;
    const DEFAULT_ORDER: SortOrder = SortOrder::Asc;

    fn column(self) -> &'static str {
        match self {
            ArtistSort::Name => "a.name",
            ArtistSort::CreatedAt => "a.created_at",
            ArtistSort::UpdatedAt => "a.updated_at",
        }
    }
}

pub(crate) fn artist_from_row(row: &SqliteRow) -> Result<Artist> {
    let guid: String = row.try_get("guid")?;

    Ok(Artist {
        id: uuid_utils::parse_guid(&guid)?,
        name: row.try_get("name")?,
        bio: row.try_get("bio")?,
        image: row.try_get("image")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn not_found(id: Uuid) -> Error {
    Error::NotFound(format!("Artist not found: {}", id))
}

/// Insert a new artist
pub async fn create_artist(pool: &SqlitePool, new: NewArtist) -> Result<Artist> {
    let now = time::now();
    let artist = Artist {
        id: uuid_utils::generate(),
        name: required_text(&new.name, "name")?,
        bio: optional_text(new.bio),
        image: optional_text(new.image),
        created_at: now,
        updated_at: now,
    };

    sqlx::query(
        r#"
        INSERT INTO artists (guid, name, bio, image, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(artist.id.to_string())
    .bind(&artist.name)
    .bind(&artist.bio)
    .bind(&artist.image)
    .bind(time::to_db(&artist.created_at))
    .bind(time::to_db(&artist.updated_at))
    .execute(pool)
    .await?;

    info!(artist_id = %artist.id, name = %artist.name, "Created artist");
    Ok(artist)
}

pub(crate) async fn find_artist(conn: &mut SqliteConnection, id: Uuid) -> Result<Option<Artist>> {
    let row = sqlx::query(&format!("SELECT {} FROM artists a WHERE a.guid = ?", ARTIST_COLUMNS))
        .bind(id.to_string())
        .fetch_optional(&mut *conn)
        .await?;

    row.as_ref().map(artist_from_row).transpose()
}

/// Load one artist
pub async fn get_artist(pool: &SqlitePool, id: Uuid) -> Result<Artist> {
    let mut conn = pool.acquire().await?;
    find_artist(&mut conn, id).await?.ok_or_else(|| not_found(id))
}

/// Artist with its tracks (newest first) and the albums those tracks belong to
pub async fn get_artist_detail(pool: &SqlitePool, id: Uuid) -> Result<ArtistDetail> {
    let mut conn = pool.acquire().await?;
    let artist = find_artist(&mut conn, id).await?.ok_or_else(|| not_found(id))?;

    let track_rows = sqlx::query(&format!(
        r#"
        SELECT {}
        FROM tracks t
        JOIN track_artists ta ON ta.track_id = t.guid
        WHERE ta.artist_id = ?
        ORDER BY t.created_at DESC, t.guid DESC
        "#,
        tracks::SUMMARY_COLUMNS
    ))
    .bind(id.to_string())
    .fetch_all(&mut *conn)
    .await?;
    let tracks = track_rows
        .iter()
        .map(tracks::summary_from_row)
        .collect::<Result<Vec<_>>>()?;

    let album_rows = sqlx::query(&format!(
        r#"
        SELECT DISTINCT {}
        FROM albums al
        JOIN tracks t ON t.album_id = al.guid
        JOIN track_artists ta ON ta.track_id = t.guid
        WHERE ta.artist_id = ?
        ORDER BY al.release_date DESC, al.guid DESC
        "#,
        albums::ALBUM_COLUMNS
    ))
    .bind(id.to_string())
    .fetch_all(&mut *conn)
    .await?;
    let albums = album_rows
        .iter()
        .map(albums::album_from_row)
        .collect::<Result<Vec<_>>>()?;

    Ok(ArtistDetail {
        artist,
        tracks,
        albums,
    })
}

/// Search over name, bio and the titles of the artist's tracks
fn push_filter(qb: &mut QueryBuilder<'_, Sqlite>, term: Option<&str>) {
    if let Some(term) = term {
        qb.push(" AND (");
        push_contains(qb, "a.name", term);
        qb.push(" OR ");
        push_contains(qb, "a.bio", term);
        qb.push(
            " OR EXISTS (SELECT 1 FROM track_artists ta JOIN tracks t ON t.guid = ta.track_id \
             WHERE ta.artist_id = a.guid AND ",
        );
        push_contains(qb, "t.title", term);
        qb.push("))");
    }
}

/// One page of artists with their track counts
pub async fn list_artists(
    pool: &SqlitePool,
    params: &ListParams<ArtistSort>,
) -> Result<Page<ArtistListItem>> {
    let term = params.search_term();
    let mut conn = pool.acquire().await?;

    let mut count = QueryBuilder::new("SELECT COUNT(*) FROM artists a WHERE 1 = 1");
    push_filter(&mut count, term.as_deref());
    let total = fetch_count(&mut conn, count).await?;

    let mut qb = QueryBuilder::new(format!(
        "SELECT {}, (SELECT COUNT(*) FROM track_artists ta WHERE ta.artist_id = a.guid) AS track_count \
         FROM artists a WHERE 1 = 1",
        ARTIST_COLUMNS
    ));
    push_filter(&mut qb, term.as_deref());
    params.push_order_by(&mut qb, "a.guid");
    params.push_limit(&mut qb);

    let rows = qb.build().fetch_all(&mut *conn).await?;
    let data = rows
        .iter()
        .map(|row| {
            Ok(ArtistListItem {
                artist: artist_from_row(row)?,
                track_count: row.try_get("track_count")?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Page::new(data, total, params.page))
}

/// Apply a partial update
pub async fn update_artist(pool: &SqlitePool, id: Uuid, update: ArtistUpdate) -> Result<Artist> {
    if update.is_empty() {
        return Err(Error::InvalidInput("No fields to update".to_string()));
    }

    let mut artist = get_artist(pool, id).await?;
    if let Some(name) = update.name {
        artist.name = required_text(&name, "name")?;
    }
    if let Some(bio) = update.bio {
        artist.bio = optional_text(Some(bio));
    }
    if let Some(image) = update.image {
        artist.image = optional_text(Some(image));
    }
    artist.updated_at = time::now();

    let result = sqlx::query(
        "UPDATE artists SET name = ?, bio = ?, image = ?, updated_at = ? WHERE guid = ?",
    )
    .bind(&artist.name)
    .bind(&artist.bio)
    .bind(&artist.image)
    .bind(time::to_db(&artist.updated_at))
    .bind(id.to_string())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(not_found(id));
    }

    info!(artist_id = %id, "Updated artist");
    Ok(artist)
}

/// Delete an artist and its credits
///
/// Refused with `Conflict` while the artist is the only credit of any track,
/// since a track must keep at least one artist.
pub async fn delete_artist(pool: &SqlitePool, id: Uuid) -> Result<()> {
    let mut tx = pool.begin().await?;

    if find_artist(&mut tx, id).await?.is_none() {
        return Err(not_found(id));
    }

    let (sole_credits,): (i64,) = sqlx::query_as(
        r#"
        SELECT COUNT(*) FROM track_artists ta
        WHERE ta.artist_id = ?
          AND NOT EXISTS (
              SELECT 1 FROM track_artists other
              WHERE other.track_id = ta.track_id AND other.artist_id <> ta.artist_id
          )
        "#,
    )
    .bind(id.to_string())
    .fetch_one(&mut *tx)
    .await?;

    if sole_credits > 0 {
        return Err(Error::Conflict(format!(
            "Artist is the only credited artist of {} track(s)",
            sole_credits
        )));
    }

    sqlx::query("DELETE FROM track_artists WHERE artist_id = ?")
        .bind(id.to_string())
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM artists WHERE guid = ?")
        .bind(id.to_string())
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    info!(artist_id = %id, "Deleted artist");
    Ok(())
}
