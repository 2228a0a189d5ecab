//! Artist endpoints
//!
//! GET /api/artist, GET /api/artist/search, GET /api/artist/:id,
//! POST /api/artist, PUT /api/artist/:id, DELETE /api/artist/:id

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use mcat_common::db::{Artist, ArtistDetail, ArtistListItem};
use mcat_common::{uuid_utils, Page};
use serde::Deserialize;

use crate::api::form::{FormData, JsonBody, Payload};
use crate::api::query::ListQuery;
use crate::db::artists::{self, ArtistSort, ArtistUpdate, NewArtist};
use crate::db::ListParams;
use crate::error::ApiResult;
use crate::AppState;

/// POST /api/artist body
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateArtistRequest {
    #[serde(default)]
    pub name: String,
    pub bio: Option<String>,
    pub image: Option<String>,
}

/// PUT /api/artist/:id body
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateArtistRequest {
    pub name: Option<String>,
    pub bio: Option<String>,
    pub image: Option<String>,
}

/// GET /api/artist
pub async fn list_artists(
    State(state): State<AppState>,
    query: ListQuery,
) -> ApiResult<Json<Page<ArtistListItem>>> {
    let params: ListParams<ArtistSort> = query.to_params()?;
    Ok(Json(artists::list_artists(&state.db, &params).await?))
}

/// GET /api/artist/search
pub async fn search_artists(
    State(state): State<AppState>,
    query: ListQuery,
) -> ApiResult<Json<Page<ArtistListItem>>> {
    query.required_search()?;
    let params: ListParams<ArtistSort> = query.to_params()?;
    Ok(Json(artists::list_artists(&state.db, &params).await?))
}

/// GET /api/artist/:id
pub async fn get_artist(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ArtistDetail>> {
    let id = uuid_utils::parse_id(&id, "Artist")?;
    Ok(Json(artists::get_artist_detail(&state.db, id).await?))
}

/// POST /api/artist
///
/// A multipart form uploads its `image` file before the row is written.
pub async fn create_artist(
    State(state): State<AppState>,
    payload: Payload<CreateArtistRequest>,
) -> ApiResult<(StatusCode, Json<Artist>)> {
    let new = match payload {
        Payload::Json(req) => NewArtist {
            name: req.name,
            bio: req.bio,
            image: req.image,
        },
        Payload::Form(form) => artist_from_form(&state, form).await?,
    };

    let artist = artists::create_artist(&state.db, new).await?;
    Ok((StatusCode::CREATED, Json(artist)))
}

async fn artist_from_form(state: &AppState, mut form: FormData) -> ApiResult<NewArtist> {
    let name = crate::db::required_text(&form.text("name").unwrap_or_default(), "name")?;

    let image = match form.take_file("image") {
        Some(file) => {
            file.validate("image")?;
            Some(state.uploads.image.upload_image(file).await?)
        }
        None => form.text("image"),
    };

    Ok(NewArtist {
        name,
        bio: form.text("bio"),
        image,
    })
}

/// PUT /api/artist/:id
pub async fn update_artist(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<UpdateArtistRequest>,
) -> ApiResult<Json<Artist>> {
    let id = uuid_utils::parse_id(&id, "Artist")?;
    let update = ArtistUpdate {
        name: req.name,
        bio: req.bio,
        image: req.image,
    };
    Ok(Json(artists::update_artist(&state.db, id, update).await?))
}

/// DELETE /api/artist/:id
pub async fn delete_artist(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id = uuid_utils::parse_id(&id, "Artist")?;
    artists::delete_artist(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Build artist routes
pub fn artist_routes() -> Router<AppState> {
    Router::new()
        .route("/api/artist", get(list_artists).post(create_artist))
        .route("/api/artist/search", get(search_artists))
        .route(
            "/api/artist/:id",
            get(get_artist).put(update_artist).delete(delete_artist),
        )
}
