//! Album endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use mcat_common::dates::parse_release_date;
use mcat_common::db::{Album, AlbumDetail, AlbumListItem, Track};
use mcat_common::{uuid_utils, Page};
use serde::Deserialize;

use crate::api::form::{FormData, JsonBody, Payload};
use crate::api::query::ListQuery;
use crate::db::albums::{self, AlbumSort, AlbumUpdate, NewAlbum};
use crate::db::tracks::{self, TrackFilter, TrackSort};
use crate::db::ListParams;
use crate::error::ApiResult;
use crate::AppState;

/// POST /api/album body
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAlbumRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub release_date: String,
    pub cover_url: Option<String>,
}

/// PUT /api/album/:id body
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAlbumRequest {
    pub title: Option<String>,
    pub release_date: Option<String>,
    pub cover_url: Option<String>,
}

/// GET /api/album
pub async fn list_albums(
    State(state): State<AppState>,
    query: ListQuery,
) -> ApiResult<Json<Page<AlbumListItem>>> {
    let params: ListParams<AlbumSort> = query.to_params()?;
    Ok(Json(albums::list_albums(&state.db, &params).await?))
}

/// GET /api/album/search
pub async fn search_albums(
    State(state): State<AppState>,
    query: ListQuery,
) -> ApiResult<Json<Page<AlbumListItem>>> {
    query.required_search()?;
    let params: ListParams<AlbumSort> = query.to_params()?;
    Ok(Json(albums::list_albums(&state.db, &params).await?))
}

/// GET /api/album/artist/:id
pub async fn list_artist_albums(
    State(state): State<AppState>,
    Path(artist_id): Path<String>,
    query: ListQuery,
) -> ApiResult<Json<Page<AlbumListItem>>> {
    let artist_id = uuid_utils::parse_id(&artist_id, "Artist")?;
    let params: ListParams<AlbumSort> = query.to_params()?;
    Ok(Json(
        albums::list_albums_by_artist(&state.db, artist_id, &params).await?,
    ))
}

/// GET /api/album/:id
pub async fn get_album(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<AlbumDetail>> {
    let id = uuid_utils::parse_id(&id, "Album")?;
    Ok(Json(albums::get_album_detail(&state.db, id).await?))
}

/// GET /api/album/:id/tracks
pub async fn list_album_tracks(
    State(state): State<AppState>,
    Path(id): Path<String>,
    query: ListQuery,
) -> ApiResult<Json<Page<Track>>> {
    let id = uuid_utils::parse_id(&id, "Album")?;
    let params: ListParams<TrackSort> = query.to_params()?;
    let filter = TrackFilter::by_album(id).with_scope(query.search_scope()?);

    albums::get_album(&state.db, id).await?;
    Ok(Json(tracks::list_tracks(&state.db, &filter, &params).await?))
}

/// POST /api/album
pub async fn create_album(
    State(state): State<AppState>,
    payload: Payload<CreateAlbumRequest>,
) -> ApiResult<(StatusCode, Json<Album>)> {
    let new = match payload {
        Payload::Json(req) => NewAlbum {
            title: req.title,
            release_date: parse_release_date(&req.release_date)?,
            cover_url: req.cover_url,
        },
        Payload::Form(form) => album_from_form(&state, form).await?,
    };

    let album = albums::create_album(&state.db, new).await?;
    Ok((StatusCode::CREATED, Json(album)))
}

async fn album_from_form(state: &AppState, mut form: FormData) -> ApiResult<NewAlbum> {
    // Reject bad text before spending an upload
    let title = crate::db::required_text(&form.text("title").unwrap_or_default(), "title")?;
    let release_date = parse_release_date(&form.text("releaseDate").unwrap_or_default())?;

    let cover_url = match form.take_file("cover") {
        Some(file) => {
            file.validate("image")?;
            Some(state.uploads.image.upload_image(file).await?)
        }
        None => form.text("coverUrl"),
    };

    Ok(NewAlbum {
        title,
        release_date,
        cover_url,
    })
}

/// PUT /api/album/:id
pub async fn update_album(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<UpdateAlbumRequest>,
) -> ApiResult<Json<Album>> {
    let id = uuid_utils::parse_id(&id, "Album")?;
    let update = AlbumUpdate {
        title: req.title,
        release_date: req.release_date.as_deref().map(parse_release_date).transpose()?,
        cover_url: req.cover_url,
    };
    Ok(Json(albums::update_album(&state.db, id, update).await?))
}

/// DELETE /api/album/:id
///
/// Tracks of the album stay, detached.
pub async fn delete_album(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id = uuid_utils::parse_id(&id, "Album")?;
    albums::delete_album(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Build album routes
pub fn album_routes() -> Router<AppState> {
    Router::new()
        .route("/api/album", get(list_albums).post(create_album))
        .route("/api/album/search", get(search_albums))
        .route("/api/album/artist/:id", get(list_artist_albums))
        .route(
            "/api/album/:id",
            get(get_album).put(update_album).delete(delete_album),
        )
        .route("/api/album/:id/tracks", get(list_album_tracks))
}
