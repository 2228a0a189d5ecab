//! Track persistence
//!
//! A track row is always returned with its credited artists (in credit
//! order), its album and its genres. Relations are loaded with one query per
//! relation for the whole page, never per track.

use chrono::{DateTime, Utc};
use mcat_common::db::{AlbumRef, ArtistRef, GenreRef, Track, TrackSummary};
use mcat_common::{time, uuid_utils, Error, Page, Result, SortOrder};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqliteConnection, SqlitePool};
use std::collections::HashMap;
use std::str::FromStr;
use tracing::info;
use uuid::Uuid;

use super::query::{push_contains, related_ids, sort_names, ListParams, SortField};
use super::{fetch_count, join_ids, missing_ids, optional_text, required_text, validate_duration};

pub(crate) const SUMMARY_COLUMNS: &str = "t.guid AS guid, t.title AS title, t.duration AS duration, \
     t.audio_url AS audio_url, t.cover_url AS cover_url, t.album_id AS album_id, t.created_at AS created_at";

const TRACK_FROM: &str = "FROM tracks t LEFT JOIN albums al ON al.guid = t.album_id";

/// Fields of a new track
#[derive(Debug, Clone, Default)]
pub struct NewTrack {
    pub title: String,
    /// Credit order; at least one required
    pub artist_ids: Vec<Uuid>,
    pub audio_url: String,
    pub album_id: Option<Uuid>,
    pub genre_ids: Vec<Uuid>,
    pub cover_url: Option<String>,
    pub duration: Option<i64>,
}

/// Partial track update
///
/// `artist_ids`/`genre_ids` replace the whole set. `album_id: Some(None)`
/// detaches the track from its album.
#[derive(Debug, Clone, Default)]
pub struct TrackUpdate {
    pub title: Option<String>,
    pub artist_ids: Option<Vec<Uuid>>,
    pub audio_url: Option<String>,
    pub album_id: Option<Option<Uuid>>,
    pub genre_ids: Option<Vec<Uuid>>,
    pub cover_url: Option<String>,
    pub duration: Option<i64>,
}

impl TrackUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.artist_ids.is_none()
            && self.audio_url.is_none()
            && self.album_id.is_none()
            && self.genre_ids.is_none()
            && self.cover_url.is_none()
            && self.duration.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackSort {
    Title,
    Duration,
    CreatedAt,
    UpdatedAt,
}

sort_names!(TrackSort {
    "title" => Title,
    "duration" => Duration,
    "createdAt" => CreatedAt,
    "updatedAt" => UpdatedAt,
});

impl SortField for TrackSort {
    const DEFAULT: Self = TrackSort::CreatedAt;
    const DEFAULT_ORDER: SortOrder = SortOrder::Desc;

    fn column(self) -> &'static str {
        match self {
            TrackSort::Title => "t.title",
            TrackSort::Duration => "t.duration",
            TrackSort::CreatedAt => "t.created_at",
            TrackSort::UpdatedAt => "t.updated_at",
        }
    }
}

/// Which fields a track search term is matched against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchScope {
    Title,
    Artist,
    Album,
    Genre,
    #[default]
    All,
}

impl FromStr for SearchScope {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "title" => Ok(SearchScope::Title),
            "artist" => Ok(SearchScope::Artist),
            "album" => Ok(SearchScope::Album),
            "genre" => Ok(SearchScope::Genre),
            "all" => Ok(SearchScope::All),
            other => Err(Error::InvalidInput(format!(
                "searchBy must be one of [title, artist, album, genre, all] (got '{}')",
                other
            ))),
        }
    }
}

/// Relation filters of a track list, combined with AND
#[derive(Debug, Clone, Copy, Default)]
pub struct TrackFilter {
    pub scope: SearchScope,
    pub artist_id: Option<Uuid>,
    pub album_id: Option<Uuid>,
    pub genre_id: Option<Uuid>,
}

impl TrackFilter {
    pub fn by_artist(artist_id: Uuid) -> Self {
        Self {
            artist_id: Some(artist_id),
            ..Default::default()
        }
    }

    pub fn by_album(album_id: Uuid) -> Self {
        Self {
            album_id: Some(album_id),
            ..Default::default()
        }
    }

    pub fn by_genre(genre_id: Uuid) -> Self {
        Self {
            genre_id: Some(genre_id),
            ..Default::default()
        }
    }

    pub fn with_scope(mut self, scope: SearchScope) -> Self {
        self.scope = scope;
        self
    }
}

fn parse_optional_guid(value: Option<String>) -> Result<Option<Uuid>> {
    value.as_deref().map(uuid_utils::parse_guid).transpose()
}

pub(crate) fn summary_from_row(row: &SqliteRow) -> Result<TrackSummary> {
    let guid: String = row.try_get("guid")?;

    Ok(TrackSummary {
        id: uuid_utils::parse_guid(&guid)?,
        title: row.try_get("title")?,
        duration: row.try_get("duration")?,
        audio_url: row.try_get("audio_url")?,
        cover_url: row.try_get("cover_url")?,
        album_id: parse_optional_guid(row.try_get("album_id")?)?,
        created_at: row.try_get("created_at")?,
    })
}

fn track_from_row(row: &SqliteRow) -> Result<Track> {
    let summary = summary_from_row(row)?;

    let album = match parse_optional_guid(row.try_get("album_guid")?)? {
        Some(id) => Some(AlbumRef {
            id,
            title: row.try_get("album_title")?,
            cover_url: row.try_get("album_cover_url")?,
            release_date: row.try_get("album_release_date")?,
        }),
        None => None,
    };

    Ok(Track {
        id: summary.id,
        title: summary.title,
        duration: summary.duration,
        audio_url: summary.audio_url,
        cover_url: summary.cover_url,
        album_id: summary.album_id,
        created_at: summary.created_at,
        updated_at: row.try_get("updated_at")?,
        artists: Vec::new(),
        album,
        genres: Vec::new(),
    })
}

/// `SELECT <track columns> FROM tracks t LEFT JOIN albums al ...`
///
/// Callers append `WHERE`/`ORDER BY` and hand the builder to [`fetch_tracks`].
pub(crate) fn select_tracks() -> QueryBuilder<'static, Sqlite> {
    QueryBuilder::new(format!(
        "SELECT {}, t.updated_at AS updated_at, al.guid AS album_guid, al.title AS album_title, \
         al.cover_url AS album_cover_url, al.release_date AS album_release_date {}",
        SUMMARY_COLUMNS, TRACK_FROM
    ))
}

/// Run a track query built on [`select_tracks`] and load relations
pub(crate) async fn fetch_tracks(
    conn: &mut SqliteConnection,
    mut qb: QueryBuilder<'_, Sqlite>,
) -> Result<Vec<Track>> {
    let rows = qb.build().fetch_all(&mut *conn).await?;
    let mut tracks = rows
        .iter()
        .map(track_from_row)
        .collect::<Result<Vec<_>>>()?;

    attach_relations(conn, &mut tracks).await?;
    Ok(tracks)
}

fn push_id_list(qb: &mut QueryBuilder<'_, Sqlite>, tracks: &[Track]) {
    let mut separated = qb.separated(", ");
    for track in tracks {
        separated.push_bind(track.id.to_string());
    }
    separated.push_unseparated(")");
}

async fn attach_relations(conn: &mut SqliteConnection, tracks: &mut [Track]) -> Result<()> {
    if tracks.is_empty() {
        return Ok(());
    }

    let index: HashMap<Uuid, usize> = tracks
        .iter()
        .enumerate()
        .map(|(i, t)| (t.id, i))
        .collect();

    let mut qb = QueryBuilder::<Sqlite>::new(
        "SELECT ta.track_id AS track_id, a.guid AS guid, a.name AS name, a.image AS image \
         FROM track_artists ta JOIN artists a ON a.guid = ta.artist_id WHERE ta.track_id IN (",
    );
    push_id_list(&mut qb, tracks);
    qb.push(" ORDER BY ta.position, a.name");

    for row in qb.build().fetch_all(&mut *conn).await? {
        let track_id = uuid_utils::parse_guid(&row.try_get::<String, _>("track_id")?)?;
        let guid: String = row.try_get("guid")?;
        if let Some(&i) = index.get(&track_id) {
            tracks[i].artists.push(ArtistRef {
                id: uuid_utils::parse_guid(&guid)?,
                name: row.try_get("name")?,
                image: row.try_get("image")?,
            });
        }
    }

    let mut qb = QueryBuilder::<Sqlite>::new(
        "SELECT tg.track_id AS track_id, g.guid AS guid, g.name AS name, g.image AS image \
         FROM track_genres tg JOIN genres g ON g.guid = tg.genre_id WHERE tg.track_id IN (",
    );
    push_id_list(&mut qb, tracks);
    qb.push(" ORDER BY g.name");

    for row in qb.build().fetch_all(&mut *conn).await? {
        let track_id = uuid_utils::parse_guid(&row.try_get::<String, _>("track_id")?)?;
        let guid: String = row.try_get("guid")?;
        if let Some(&i) = index.get(&track_id) {
            tracks[i].genres.push(GenreRef {
                id: uuid_utils::parse_guid(&guid)?,
                name: row.try_get("name")?,
                image: row.try_get("image")?,
            });
        }
    }

    Ok(())
}

pub(crate) async fn find_track(conn: &mut SqliteConnection, id: Uuid) -> Result<Option<Track>> {
    let mut qb = select_tracks();
    qb.push(" WHERE t.guid = ").push_bind(id.to_string());
    Ok(fetch_tracks(conn, qb).await?.into_iter().next())
}

fn not_found(id: Uuid) -> Error {
    Error::NotFound(format!("Track not found: {}", id))
}

pub async fn get_track(pool: &SqlitePool, id: Uuid) -> Result<Track> {
    let mut conn = pool.acquire().await?;
    find_track(&mut conn, id).await?.ok_or_else(|| not_found(id))
}

async fn ensure_exist(
    conn: &mut SqliteConnection,
    table: &'static str,
    entity: &str,
    ids: &[Uuid],
) -> Result<()> {
    let missing = missing_ids(conn, table, ids).await?;
    if missing.is_empty() {
        Ok(())
    } else {
        Err(Error::NotFound(format!("{} not found: {}", entity, join_ids(&missing))))
    }
}

async fn replace_artist_links(
    conn: &mut SqliteConnection,
    track_id: Uuid,
    artist_ids: &[Uuid],
) -> Result<()> {
    sqlx::query("DELETE FROM track_artists WHERE track_id = ?")
        .bind(track_id.to_string())
        .execute(&mut *conn)
        .await?;

    for (position, artist_id) in artist_ids.iter().enumerate() {
        sqlx::query("INSERT INTO track_artists (track_id, artist_id, position) VALUES (?, ?, ?)")
            .bind(track_id.to_string())
            .bind(artist_id.to_string())
            .bind(position as i64)
            .execute(&mut *conn)
            .await?;
    }

    Ok(())
}

/// Make the track's genre set exactly `genre_ids`
///
/// Tags that survive keep their id and creation time.
async fn replace_genre_links(
    conn: &mut SqliteConnection,
    track_id: Uuid,
    genre_ids: &[Uuid],
    now: &DateTime<Utc>,
) -> Result<()> {
    let mut qb = QueryBuilder::<Sqlite>::new("DELETE FROM track_genres WHERE track_id = ");
    qb.push_bind(track_id.to_string());
    if !genre_ids.is_empty() {
        qb.push(" AND genre_id NOT IN (");
        let mut separated = qb.separated(", ");
        for genre_id in genre_ids {
            separated.push_bind(genre_id.to_string());
        }
        separated.push_unseparated(")");
    }
    qb.build().execute(&mut *conn).await?;

    for genre_id in genre_ids {
        sqlx::query(
            r#"
            INSERT INTO track_genres (guid, track_id, genre_id, created_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(track_id, genre_id) DO NOTHING
            "#,
        )
        .bind(uuid_utils::generate().to_string())
        .bind(track_id.to_string())
        .bind(genre_id.to_string())
        .bind(time::to_db(now))
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

fn required_artists(artist_ids: &[Uuid]) -> Result<Vec<Uuid>> {
    let unique = related_ids(artist_ids, "artistIds")?;
    if unique.is_empty() {
        return Err(Error::InvalidInput("At least one artist is required".to_string()));
    }
    Ok(unique)
}

/// Create a track with its artist and genre links
///
/// Album, artists and genres are checked inside the same transaction as the
/// inserts; any missing reference rejects the whole write.
pub async fn create_track(pool: &SqlitePool, new: NewTrack) -> Result<Track> {
    let title = required_text(&new.title, "title")?;
    let audio_url = required_text(&new.audio_url, "audioUrl")?;
    validate_duration(new.duration)?;
    let artist_ids = required_artists(&new.artist_ids)?;
    let genre_ids = related_ids(&new.genre_ids, "genreIds")?;

    let id = uuid_utils::generate();
    let now = time::now();

    let mut tx = pool.begin().await?;

    if let Some(album_id) = new.album_id {
        ensure_exist(&mut tx, "albums", "Album", &[album_id]).await?;
    }
    ensure_exist(&mut tx, "artists", "Artist", &artist_ids).await?;
    ensure_exist(&mut tx, "genres", "Genre", &genre_ids).await?;

    sqlx::query(
        r#"
        INSERT INTO tracks (guid, title, duration, audio_url, cover_url, album_id, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(&title)
    .bind(new.duration)
    .bind(&audio_url)
    .bind(optional_text(new.cover_url))
    .bind(new.album_id.map(|a| a.to_string()))
    .bind(time::to_db(&now))
    .bind(time::to_db(&now))
    .execute(&mut *tx)
    .await?;

    replace_artist_links(&mut tx, id, &artist_ids).await?;
    replace_genre_links(&mut tx, id, &genre_ids, &now).await?;

    let track = find_track(&mut tx, id).await?.ok_or_else(|| not_found(id))?;
    tx.commit().await?;

    info!(
        track_id = %id,
        title = %track.title,
        artists = artist_ids.len(),
        genres = genre_ids.len(),
        "Created track"
    );
    Ok(track)
}

fn push_relation_filters(qb: &mut QueryBuilder<'_, Sqlite>, filter: &TrackFilter) {
    if let Some(artist_id) = filter.artist_id {
        qb.push(" AND EXISTS (SELECT 1 FROM track_artists fa WHERE fa.track_id = t.guid AND fa.artist_id = ")
            .push_bind(artist_id.to_string())
            .push(")");
    }
    if let Some(album_id) = filter.album_id {
        qb.push(" AND t.album_id = ").push_bind(album_id.to_string());
    }
    if let Some(genre_id) = filter.genre_id {
        qb.push(" AND EXISTS (SELECT 1 FROM track_genres fg WHERE fg.track_id = t.guid AND fg.genre_id = ")
            .push_bind(genre_id.to_string())
            .push(")");
    }
}

fn push_search(qb: &mut QueryBuilder<'_, Sqlite>, scope: SearchScope, term: &str) {
    let all = scope == SearchScope::All;
    let mut joiner = " AND (";

    if all || scope == SearchScope::Title {
        qb.push(joiner);
        joiner = " OR ";
        push_contains(qb, "t.title", term);
    }
    if all || scope == SearchScope::Artist {
        qb.push(joiner);
        joiner = " OR ";
        qb.push(
            "EXISTS (SELECT 1 FROM track_artists sa JOIN artists a ON a.guid = sa.artist_id \
             WHERE sa.track_id = t.guid AND ",
        );
        push_contains(qb, "a.name", term);
        qb.push(")");
    }
    if all || scope == SearchScope::Album {
        qb.push(joiner);
        joiner = " OR ";
        push_contains(qb, "al.title", term);
    }
    if all || scope == SearchScope::Genre {
        qb.push(joiner);
        qb.push(
            "EXISTS (SELECT 1 FROM track_genres sg JOIN genres g ON g.guid = sg.genre_id \
             WHERE sg.track_id = t.guid AND ",
        );
        push_contains(qb, "g.name", term);
        qb.push(")");
    }
    qb.push(")");
}

fn push_filter(qb: &mut QueryBuilder<'_, Sqlite>, filter: &TrackFilter, term: Option<&str>) {
    push_relation_filters(qb, filter);
    if let Some(term) = term {
        push_search(qb, filter.scope, term);
    }
}

pub(crate) async fn list_tracks_on(
    conn: &mut SqliteConnection,
    filter: &TrackFilter,
    params: &ListParams<TrackSort>,
) -> Result<Page<Track>> {
    let term = params.search_term();

    let mut count = QueryBuilder::new(format!("SELECT COUNT(*) {} WHERE 1 = 1", TRACK_FROM));
    push_filter(&mut count, filter, term.as_deref());
    let total = fetch_count(conn, count).await?;

    let mut qb = select_tracks();
    qb.push(" WHERE 1 = 1");
    push_filter(&mut qb, filter, term.as_deref());
    params.push_order_by(&mut qb, "t.guid");
    params.push_limit(&mut qb);
    let data = fetch_tracks(conn, qb).await?;

    Ok(Page::new(data, total, params.page))
}

/// One page of tracks
pub async fn list_tracks(
    pool: &SqlitePool,
    filter: &TrackFilter,
    params: &ListParams<TrackSort>,
) -> Result<Page<Track>> {
    let mut conn = pool.acquire().await?;
    list_tracks_on(&mut conn, filter, params).await
}

/// Apply a partial update; relation sets are replaced atomically
pub async fn update_track(pool: &SqlitePool, id: Uuid, update: TrackUpdate) -> Result<Track> {
    if update.is_empty() {
        return Err(Error::InvalidInput("No fields to update".to_string()));
    }
    let artist_ids = update.artist_ids.as_deref().map(required_artists).transpose()?;
    let genre_ids = update
        .genre_ids
        .as_deref()
        .map(|ids| related_ids(ids, "genreIds"))
        .transpose()?;

    let mut tx = pool.begin().await?;
    let mut track = find_track(&mut tx, id).await?.ok_or_else(|| not_found(id))?;

    if let Some(title) = &update.title {
        track.title = required_text(title, "title")?;
    }
    if let Some(audio_url) = &update.audio_url {
        track.audio_url = required_text(audio_url, "audioUrl")?;
    }
    if let Some(cover_url) = update.cover_url {
        track.cover_url = optional_text(Some(cover_url));
    }
    if let Some(duration) = update.duration {
        validate_duration(Some(duration))?;
        track.duration = Some(duration);
    }
    if let Some(album_id) = update.album_id {
        if let Some(album_id) = album_id {
            ensure_exist(&mut tx, "albums", "Album", &[album_id]).await?;
        }
        track.album_id = album_id;
    }

    let now = time::now();
    sqlx::query(
        r#"
        UPDATE tracks
        SET title = ?, duration = ?, audio_url = ?, cover_url = ?, album_id = ?, updated_at = ?
        WHERE guid = ?
        "#,
    )
    .bind(&track.title)
    .bind(track.duration)
    .bind(&track.audio_url)
    .bind(&track.cover_url)
    .bind(track.album_id.map(|a| a.to_string()))
    .bind(time::to_db(&now))
    .bind(id.to_string())
    .execute(&mut *tx)
    .await?;

    if let Some(artist_ids) = &artist_ids {
        ensure_exist(&mut tx, "artists", "Artist", artist_ids).await?;
        replace_artist_links(&mut tx, id, artist_ids).await?;
    }
    if let Some(genre_ids) = &genre_ids {
        ensure_exist(&mut tx, "genres", "Genre", &genre_ids).await?;
        replace_genre_links(&mut tx, id, &genre_ids, &now).await?;
    }

    let track = find_track(&mut tx, id).await?.ok_or_else(|| not_found(id))?;
    tx.commit().await?;

    info!(track_id = %id, "Updated track");
    Ok(track)
}

/// Delete a track; its artist and genre links cascade
pub async fn delete_track(pool: &SqlitePool, id: Uuid) -> Result<()> {
    let result = sqlx::query("DELETE FROM tracks WHERE guid = ?")
        .bind(id.to_string())
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(not_found(id));
    }

    info!(track_id = %id, "Deleted track");
    Ok(())
}
