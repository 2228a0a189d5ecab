//! Catalog entities and the shapes they are returned in
//!
//! Every struct serializes with camelCase field names. Ids are UUID v4 and
//! render as hyphenated strings.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artist {
    pub id: Uuid,
    pub name: String,
    pub bio: Option<String>,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Album {
    pub id: Uuid,
    pub title: String,
    /// Calendar date only, `YYYY-MM-DD`
    pub release_date: NaiveDate,
    pub cover_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Genre {
    pub id: Uuid,
    pub name: String,
    pub image: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Credited artist as embedded in a track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtistRef {
    pub id: Uuid,
    pub name: String,
    pub image: Option<String>,
}

/// Album as embedded in a track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlbumRef {
    pub id: Uuid,
    pub title: String,
    pub cover_url: Option<String>,
    pub release_date: NaiveDate,
}

/// Genre as embedded in a track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenreRef {
    pub id: Uuid,
    pub name: String,
    pub image: String,
}

/// Track with its artists (credit order), album and genres
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub id: Uuid,
    pub title: String,
    /// Seconds
    pub duration: Option<i64>,
    pub audio_url: String,
    pub cover_url: Option<String>,
    pub album_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub artists: Vec<ArtistRef>,
    pub album: Option<AlbumRef>,
    pub genres: Vec<GenreRef>,
}

/// Track without relations, used inside artist details
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackSummary {
    pub id: Uuid,
    pub title: String,
    pub duration: Option<i64>,
    pub audio_url: String,
    pub cover_url: Option<String>,
    pub album_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtistListItem {
    #[serde(flatten)]
    pub artist: Artist,
    pub track_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtistDetail {
    #[serde(flatten)]
    pub artist: Artist,
    pub tracks: Vec<TrackSummary>,
    /// Albums reached through the artist's tracks
    pub albums: Vec<Album>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlbumListItem {
    #[serde(flatten)]
    pub album: Album,
    pub track_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlbumDetail {
    #[serde(flatten)]
    pub album: Album,
    pub tracks: Vec<Track>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenreListItem {
    #[serde(flatten)]
    pub genre: Genre,
    pub track_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenreDetail {
    #[serde(flatten)]
    pub genre: Genre,
    pub track_count: i64,
    pub tracks: Vec<Track>,
}

/// Track ↔ Genre tagging, returned by the tag operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackGenreDetail {
    pub id: Uuid,
    pub track_id: Uuid,
    pub genre_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub track: Track,
    pub genre: Genre,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_item_flattens_entity() {
        let now = Utc::now();
        let item = GenreListItem {
            genre: Genre {
                id: Uuid::nil(),
                name: "Jazz".to_string(),
                image: "https://img/jazz.png".to_string(),
                created_at: now,
                updated_at: now,
            },
            track_count: 4,
        };

        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["name"], "Jazz");
        assert_eq!(json["trackCount"], 4);
        assert_eq!(json["id"], "00000000-0000-0000-0000-000000000000");
        assert!(json.get("genre").is_none());
    }

    #[test]
    fn test_release_date_is_date_only() {
        let album_ref = AlbumRef {
            id: Uuid::nil(),
            title: "Kind of Blue".to_string(),
            cover_url: None,
            release_date: NaiveDate::from_ymd_opt(1959, 8, 17).unwrap(),
        };

        let json = serde_json::to_value(&album_ref).unwrap();
        assert_eq!(json["releaseDate"], "1959-08-17");
        assert!(json["coverUrl"].is_null());
    }
}
