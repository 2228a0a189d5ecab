//! Song endpoints
//!
//! Tracks are exposed under `/api/song`. Creation takes either JSON with an
//! already-hosted `audioUrl`, or a multipart form whose `audio` file (and
//! optional `cover` image) are uploaded before the row is written.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use mcat_common::db::Track;
use mcat_common::{uuid_utils, Error, Page};
use serde::{Deserialize, Deserializer};

use crate::api::form::{parse_duration, parse_ids, parse_optional_id, FormData, JsonBody, Payload};
use crate::api::query::ListQuery;
use crate::db::tracks::{self, NewTrack, TrackFilter, TrackSort, TrackUpdate};
use crate::db::query::related_ids;
use crate::db::{albums, artists, genres, ListParams};
use crate::error::ApiResult;
use crate::services::UploadFile;
use crate::AppState;

/// POST /api/song body
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTrackRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub artist_ids: Vec<String>,
    #[serde(default)]
    pub audio_url: String,
    pub album_id: Option<String>,
    #[serde(default)]
    pub genre_ids: Vec<String>,
    pub cover_url: Option<String>,
    pub duration: Option<f64>,
}

/// PUT /api/song/:id body
///
/// `albumId: null` detaches the track from its album; an absent `albumId`
/// leaves it unchanged.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTrackRequest {
    pub title: Option<String>,
    pub artist_ids: Option<Vec<String>>,
    pub audio_url: Option<String>,
    #[serde(default, deserialize_with = "present_or_null")]
    pub album_id: Option<Option<String>>,
    pub genre_ids: Option<Vec<String>>,
    pub cover_url: Option<String>,
    pub duration: Option<f64>,
}

fn present_or_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn round_duration(duration: Option<f64>) -> Option<i64> {
    duration.map(|d| d.round() as i64)
}

/// GET /api/song
pub async fn list_tracks(
    State(state): State<AppState>,
    query: ListQuery,
) -> ApiResult<Json<Page<Track>>> {
    let params: ListParams<TrackSort> = query.to_params()?;
    let filter = TrackFilter::default().with_scope(query.search_scope()?);
    Ok(Json(tracks::list_tracks(&state.db, &filter, &params).await?))
}

/// GET /api/song/artist/:id
pub async fn list_artist_tracks(
    State(state): State<AppState>,
    Path(artist_id): Path<String>,
    query: ListQuery,
) -> ApiResult<Json<Page<Track>>> {
    let artist_id = uuid_utils::parse_id(&artist_id, "Artist")?;
    let params: ListParams<TrackSort> = query.to_params()?;
    let filter = TrackFilter::by_artist(artist_id).with_scope(query.search_scope()?);

    artists::get_artist(&state.db, artist_id).await?;
    Ok(Json(tracks::list_tracks(&state.db, &filter, &params).await?))
}

/// GET /api/song/album/:id
pub async fn list_album_tracks(
    State(state): State<AppState>,
    Path(album_id): Path<String>,
    query: ListQuery,
) -> ApiResult<Json<Page<Track>>> {
    let album_id = uuid_utils::parse_id(&album_id, "Album")?;
    let params: ListParams<TrackSort> = query.to_params()?;
    let filter = TrackFilter::by_album(album_id).with_scope(query.search_scope()?);

    albums::get_album(&state.db, album_id).await?;
    Ok(Json(tracks::list_tracks(&state.db, &filter, &params).await?))
}

/// GET /api/song/genre/:id
pub async fn list_genre_tracks(
    State(state): State<AppState>,
    Path(genre_id): Path<String>,
    query: ListQuery,
) -> ApiResult<Json<Page<Track>>> {
    let genre_id = uuid_utils::parse_id(&genre_id, "Genre")?;
    let params: ListParams<TrackSort> = query.to_params()?;
    let filter = TrackFilter::by_genre(genre_id).with_scope(query.search_scope()?);

    genres::get_genre(&state.db, genre_id).await?;
    Ok(Json(tracks::list_tracks(&state.db, &filter, &params).await?))
}

/// GET /api/song/:id
pub async fn get_track(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Track>> {
    let id = uuid_utils::parse_id(&id, "Track")?;
    Ok(Json(tracks::get_track(&state.db, id).await?))
}

/// POST /api/song
pub async fn create_track(
    State(state): State<AppState>,
    payload: Payload<CreateTrackRequest>,
) -> ApiResult<(StatusCode, Json<Track>)> {
    let new = match payload {
        Payload::Json(req) => NewTrack {
            title: req.title,
            artist_ids: parse_ids(&req.artist_ids, "Artist")?,
            audio_url: req.audio_url,
            album_id: parse_optional_id(req.album_id.as_deref(), "Album")?,
            genre_ids: parse_ids(&req.genre_ids, "Genre")?,
            cover_url: req.cover_url,
            duration: round_duration(req.duration),
        },
        Payload::Form(form) => track_from_form(&state, form).await?,
    };

    let track = tracks::create_track(&state.db, new).await?;
    Ok((StatusCode::CREATED, Json(track)))
}

enum AudioSource {
    Upload(UploadFile),
    Hosted(String),
}

/// Validate the form, then upload audio and cover
///
/// Nothing is uploaded unless every text field is acceptable, and an upload
/// failure returns before the repository is touched.
async fn track_from_form(state: &AppState, mut form: FormData) -> ApiResult<NewTrack> {
    let title = crate::db::required_text(&form.text("title").unwrap_or_default(), "title")?;
    let artist_ids = related_ids(&parse_ids(&form.list("artistIds"), "Artist")?, "artistIds")?;
    if artist_ids.is_empty() {
        return Err(Error::InvalidInput("At least one artist is required".to_string()).into());
    }
    let album_id = parse_optional_id(form.text("albumId").as_deref(), "Album")?;
    let genre_ids = related_ids(&parse_ids(&form.list("genreIds"), "Genre")?, "genreIds")?;
    let duration = parse_duration(form.text("duration").as_deref())?;
    crate::db::validate_duration(duration)?;

    let audio = match (form.take_file("audio"), form.text("audioUrl")) {
        (Some(file), _) => {
            file.validate("audio")?;
            AudioSource::Upload(file)
        }
        (None, Some(url)) => AudioSource::Hosted(url),
        (None, None) => {
            return Err(Error::InvalidInput("audio file is required".to_string()).into());
        }
    };
    let cover = form.take_file("cover");
    if let Some(file) = &cover {
        file.validate("image")?;
    }

    let audio_url = match audio {
        AudioSource::Upload(file) => state.uploads.audio.upload_audio(file).await?,
        AudioSource::Hosted(url) => url,
    };
    let cover_url = match cover {
        Some(file) => Some(state.uploads.image.upload_image(file).await?),
        None => form.text("coverUrl"),
    };

    tracing::debug!(%title, %audio_url, "Track files ready");

    Ok(NewTrack {
        title,
        artist_ids,
        audio_url,
        album_id,
        genre_ids,
        cover_url,
        duration,
    })
}

/// PUT /api/song/:id
pub async fn update_track(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<UpdateTrackRequest>,
) -> ApiResult<Json<Track>> {
    let id = uuid_utils::parse_id(&id, "Track")?;

    let album_id = match req.album_id {
        Some(album) => Some(parse_optional_id(album.as_deref(), "Album")?),
        None => None,
    };

    let update = TrackUpdate {
        title: req.title,
        artist_ids: req.artist_ids.as_deref().map(|ids| parse_ids(ids, "Artist")).transpose()?,
        audio_url: req.audio_url,
        album_id,
        genre_ids: req.genre_ids.as_deref().map(|ids| parse_ids(ids, "Genre")).transpose()?,
        cover_url: req.cover_url,
        duration: round_duration(req.duration),
    };
    Ok(Json(tracks::update_track(&state.db, id, update).await?))
}

/// DELETE /api/song/:id
pub async fn delete_track(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id = uuid_utils::parse_id(&id, "Track")?;
    tracks::delete_track(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Build song routes
pub fn track_routes() -> Router<AppState> {
    Router::new()
        .route("/api/song", get(list_tracks).post(create_track))
        .route("/api/song/artist/:id", get(list_artist_tracks))
        .route("/api/song/album/:id", get(list_album_tracks))
        .route("/api/song/genre/:id", get(list_genre_tracks))
        .route(
            "/api/song/:id",
            get(get_track).put(update_track).delete(delete_track),
        )
}
