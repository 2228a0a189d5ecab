//! Genre endpoints, including tagging tracks with genres

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use mcat_common::db::{Genre, GenreDetail, GenreListItem, Track, TrackGenreDetail};
use mcat_common::pagination::{DEFAULT_PAGE_SIZE, GENRE_PAGE_SIZE};
use mcat_common::{uuid_utils, Page, SortOrder};
use serde::Deserialize;

use crate::api::form::{FormData, JsonBody, Payload};
use crate::api::query::ListQuery;
use crate::db::genres::{self, GenreSort, GenreUpdate, NewGenre};
use crate::db::tracks::TrackSort;
use crate::db::ListParams;
use crate::error::ApiResult;
use crate::AppState;

/// POST /api/genre body
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGenreRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub image: String,
}

/// PUT /api/genre/:id body
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateGenreRequest {
    pub name: Option<String>,
    pub image: Option<String>,
}

/// POST /api/genre/song body
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagTrackRequest {
    #[serde(default)]
    pub track_id: String,
    #[serde(default)]
    pub genre_id: String,
}

/// GET /api/genre
pub async fn list_genres(
    State(state): State<AppState>,
    query: ListQuery,
) -> ApiResult<Json<Page<GenreListItem>>> {
    let params: ListParams<GenreSort> =
        query.to_params_with(GENRE_PAGE_SIZE, GenreSort::Name, SortOrder::Asc)?;
    Ok(Json(genres::list_genres(&state.db, &params).await?))
}

/// GET /api/genre/:id
pub async fn get_genre(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<GenreDetail>> {
    let id = uuid_utils::parse_id(&id, "Genre")?;
    Ok(Json(genres::get_genre_detail(&state.db, id).await?))
}

/// GET /api/genre/:id/tracks
pub async fn list_genre_tracks(
    State(state): State<AppState>,
    Path(id): Path<String>,
    query: ListQuery,
) -> ApiResult<Json<Page<Track>>> {
    let id = uuid_utils::parse_id(&id, "Genre")?;
    let params: ListParams<TrackSort> =
        query.to_params_with(DEFAULT_PAGE_SIZE, TrackSort::Title, SortOrder::Asc)?;
    Ok(Json(genres::list_genre_tracks(&state.db, id, &params).await?))
}

/// POST /api/genre
pub async fn create_genre(
    State(state): State<AppState>,
    payload: Payload<CreateGenreRequest>,
) -> ApiResult<(StatusCode, Json<Genre>)> {
    let new = match payload {
        Payload::Json(req) => NewGenre {
            name: req.name,
            image: req.image,
        },
        Payload::Form(form) => genre_from_form(&state, form).await?,
    };

    let genre = genres::create_genre(&state.db, new).await?;
    Ok((StatusCode::CREATED, Json(genre)))
}

async fn genre_from_form(state: &AppState, mut form: FormData) -> ApiResult<NewGenre> {
    let name = crate::db::required_text(&form.text("name").unwrap_or_default(), "name")?;

    let image = match form.take_file("image") {
        Some(file) => {
            file.validate("image")?;
            state.uploads.image.upload_image(file).await?
        }
        None => crate::db::required_text(&form.text("image").unwrap_or_default(), "image")?,
    };

    Ok(NewGenre { name, image })
}

/// PUT /api/genre/:id
pub async fn update_genre(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<UpdateGenreRequest>,
) -> ApiResult<Json<Genre>> {
    let id = uuid_utils::parse_id(&id, "Genre")?;
    let update = GenreUpdate {
        name: req.name,
        image: req.image,
    };
    Ok(Json(genres::update_genre(&state.db, id, update).await?))
}

/// DELETE /api/genre/:id
///
/// Removes the genre's tags in the same transaction.
pub async fn delete_genre(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id = uuid_utils::parse_id(&id, "Genre")?;
    genres::delete_genre(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/genre/song
pub async fn tag_track(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<TagTrackRequest>,
) -> ApiResult<(StatusCode, Json<TrackGenreDetail>)> {
    let track_id = uuid_utils::parse_id(&req.track_id, "Track")?;
    let genre_id = uuid_utils::parse_id(&req.genre_id, "Genre")?;

    let tag = genres::tag_track(&state.db, track_id, genre_id).await?;
    Ok((StatusCode::CREATED, Json(tag)))
}

/// DELETE /api/genre/:id/song/:track_id
pub async fn untag_track(
    State(state): State<AppState>,
    Path((genre_id, track_id)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    let genre_id = uuid_utils::parse_id(&genre_id, "Genre")?;
    let track_id = uuid_utils::parse_id(&track_id, "Track")?;

    genres::untag_track(&state.db, genre_id, track_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Build genre routes
pub fn genre_routes() -> Router<AppState> {
    Router::new()
        .route("/api/genre", get(list_genres).post(create_genre))
        .route("/api/genre/song", post(tag_track))
        .route(
            "/api/genre/:id",
            get(get_genre).put(update_genre).delete(delete_genre),
        )
        .route("/api/genre/:id/tracks", get(list_genre_tracks))
        .route("/api/genre/:id/song/:track_id", delete(untag_track))
}
