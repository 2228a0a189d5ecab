//! HTTP tests for /api/song

mod helpers;

use std::sync::Arc;

use axum::http::StatusCode;
use helpers::*;
use mcat_api::services::UploadServices;
use serde_json::json;

#[tokio::test]
async fn test_create_track_with_relations() {
    let (app, pool) = create_test_app().await;
    let miles = seed_artist(&app, "Miles Davis").await;
    let trane = seed_artist(&app, "John Coltrane").await;
    let album = seed_album(&app, "Kind of Blue", "1959-08-17").await;
    let jazz = seed_genre(&app, "Jazz").await;

    let (status, track) = post(
        &app,
        "/api/song",
        json!({
            "title": "So What",
            "artistIds": [trane, miles, trane],
            "albumId": album,
            "genreIds": [jazz],
            "audioUrl": "https://audio.test/so-what.mp3",
            "duration": 562.4,
        }),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED, "{}", track);
    assert_eq!(track["duration"], 562);
    assert_eq!(track["albumId"], album.as_str());
    assert_eq!(track["album"]["title"], "Kind of Blue");
    assert_eq!(track["artists"].as_array().unwrap().len(), 2);
    assert_eq!(track["artists"][0]["name"], "John Coltrane");
    assert_eq!(track["artists"][1]["name"], "Miles Davis");
    assert_eq!(track["genres"][0]["name"], "Jazz");
    assert_eq!(count_rows(&pool, "track_artists").await, 2);
}

#[tokio::test]
async fn test_create_track_with_missing_artist_writes_nothing() {
    let (app, pool) = create_test_app().await;
    let miles = seed_artist(&app, "Miles Davis").await;
    let ghost = uuid::Uuid::new_v4().to_string();

    let (status, json) = post(
        &app,
        "/api/song",
        json!({ "title": "So What", "artistIds": [miles, ghost], "audioUrl": "https://audio.test/x.mp3" }),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(json["error"].as_str().unwrap().contains(&ghost));
    assert_eq!(count_rows(&pool, "tracks").await, 0);
    assert_eq!(count_rows(&pool, "track_artists").await, 0);
}

#[tokio::test]
async fn test_create_track_validation() {
    let (app, pool) = create_test_app().await;
    let miles = seed_artist(&app, "Miles Davis").await;

    let cases = [
        json!({ "title": "", "artistIds": [miles], "audioUrl": "https://audio.test/x.mp3" }),
        json!({ "title": "x", "artistIds": [], "audioUrl": "https://audio.test/x.mp3" }),
        json!({ "title": "x", "artistIds": [miles], "audioUrl": " " }),
        json!({ "title": "x", "artistIds": [miles], "audioUrl": "https://audio.test/x.mp3", "duration": -3 }),
    ];
    for body in cases {
        let (status, _) = post(&app, "/api/song", body.clone()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);
    }

    let (status, _) = post(
        &app,
        "/api/song",
        json!({ "title": "x", "artistIds": [miles], "albumId": uuid::Uuid::new_v4(), "audioUrl": "u" }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(count_rows(&pool, "tracks").await, 0);
}

#[tokio::test]
async fn test_oversized_relation_lists_are_rejected() {
    let (app, pool) = create_test_app().await;
    let miles = seed_artist(&app, "Miles Davis").await;
    let many: Vec<String> = (0..40_000).map(|_| uuid::Uuid::new_v4().to_string()).collect();

    let (status, json) = post(
        &app,
        "/api/song",
        json!({ "title": "x", "artistIds": many, "audioUrl": "https://audio.test/x.mp3" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("artistIds"));

    // Repeats of one id collapse before the cap applies
    let repeated = vec![miles.clone(); 500];
    let (status, track) = post(
        &app,
        "/api/song",
        json!({ "title": "So What", "artistIds": repeated, "audioUrl": "https://audio.test/x.mp3" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", track);
    assert_eq!(count_rows(&pool, "track_artists").await, 1);

    let genres: Vec<String> = (0..101).map(|_| uuid::Uuid::new_v4().to_string()).collect();
    let uri = format!("/api/song/{}", track["id"].as_str().unwrap());
    let (status, json) = put(&app, &uri, json!({ "genreIds": genres })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("genreIds"));
    assert_eq!(count_rows(&pool, "tracks").await, 1);
}

#[tokio::test]
async fn test_track_search_scopes() {
    let (app, _pool) = create_test_app().await;
    let miles = seed_artist(&app, "Miles Davis").await;
    let nina = seed_artist(&app, "Nina Simone").await;
    let jazz = seed_genre(&app, "Jazz").await;

    let (_, so_what) = post(
        &app,
        "/api/song",
        json!({ "title": "So What", "artistIds": [miles], "genreIds": [jazz], "audioUrl": "https://audio.test/1.mp3" }),
    )
    .await;
    seed_track(&app, "Feeling Good", &[&nina]).await;
    seed_track(&app, "Miles Runs the Voodoo Down", &[&nina]).await;

    let (_, all) = get(&app, "/api/song?query=miles").await;
    assert_eq!(all["pagination"]["total"], 2);

    let (_, by_title) = get(&app, "/api/song?query=miles&searchBy=title").await;
    assert_eq!(by_title["pagination"]["total"], 1);
    assert_eq!(by_title["data"][0]["title"], "Miles Runs the Voodoo Down");

    let (_, by_artist) = get(&app, "/api/song?search=MILES&searchBy=artist").await;
    assert_eq!(by_artist["pagination"]["total"], 1);
    assert_eq!(by_artist["data"][0]["id"], so_what["id"]);

    let (_, by_genre) = get(&app, "/api/song?query=jaz&searchBy=genre").await;
    assert_eq!(by_genre["data"][0]["title"], "So What");

    let (status, _) = get(&app, "/api/song?searchBy=lyrics").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_tracks_by_relation() {
    let (app, _pool) = create_test_app().await;
    let miles = seed_artist(&app, "Miles Davis").await;
    let nina = seed_artist(&app, "Nina Simone").await;
    seed_track(&app, "So What", &[&miles]).await;
    seed_track(&app, "Feeling Good", &[&nina]).await;

    let (status, page) = get(&app, &format!("/api/song/artist/{}", nina)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["pagination"]["total"], 1);
    assert_eq!(page["data"][0]["title"], "Feeling Good");

    for uri in ["/api/song/artist", "/api/song/album", "/api/song/genre"] {
        let (status, _) = get(&app, &format!("{}/{}", uri, uuid::Uuid::new_v4())).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{}", uri);
    }
}

#[tokio::test]
async fn test_track_sorting() {
    let (app, _pool) = create_test_app().await;
    let miles = seed_artist(&app, "Miles Davis").await;
    for (title, duration) in [("B", 300), ("A", 100), ("C", 200)] {
        post(
            &app,
            "/api/song",
            json!({ "title": title, "artistIds": [miles], "audioUrl": "u", "duration": duration }),
        )
        .await;
    }

    let (_, by_title) = get(&app, "/api/song?sortBy=title&order=asc").await;
    let titles: Vec<_> = by_title["data"].as_array().unwrap().iter().map(|t| t["title"].clone()).collect();
    assert_eq!(titles, vec![json!("A"), json!("B"), json!("C")]);

    let (_, by_duration) = get(&app, "/api/song?sortBy=duration&order=desc").await;
    assert_eq!(by_duration["data"][0]["title"], "B");

    let (status, _) = get(&app, "/api/song?sortBy=audio_url").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_update_track_replaces_relations() {
    let (app, pool) = create_test_app().await;
    let miles = seed_artist(&app, "Miles Davis").await;
    let nina = seed_artist(&app, "Nina Simone").await;
    let album = seed_album(&app, "Kind of Blue", "1959-08-17").await;
    let (_, track) = post(
        &app,
        "/api/song",
        json!({ "title": "So What", "artistIds": [miles], "albumId": album, "audioUrl": "u" }),
    )
    .await;
    let uri = format!("/api/song/{}", track["id"].as_str().unwrap());

    let (status, updated) = put(&app, &uri, json!({ "artistIds": [nina], "title": "So What (Live)" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["title"], "So What (Live)");
    assert_eq!(updated["artists"].as_array().unwrap().len(), 1);
    assert_eq!(updated["artists"][0]["name"], "Nina Simone");
    assert_eq!(updated["albumId"], album.as_str());

    let (status, detached) = put(&app, &uri, json!({ "albumId": null })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detached["albumId"], serde_json::Value::Null);

    // Unknown artist leaves the previous credits in place
    let (status, _) = put(&app, &uri, json!({ "artistIds": [uuid::Uuid::new_v4()] })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, current) = get(&app, &uri).await;
    assert_eq!(current["artists"][0]["name"], "Nina Simone");
    assert_eq!(count_rows(&pool, "track_artists").await, 1);
}

#[tokio::test]
async fn test_delete_track_cascades_links() {
    let (app, pool) = create_test_app().await;
    let miles = seed_artist(&app, "Miles Davis").await;
    let jazz = seed_genre(&app, "Jazz").await;
    let (_, track) = post(
        &app,
        "/api/song",
        json!({ "title": "So What", "artistIds": [miles], "genreIds": [jazz], "audioUrl": "u" }),
    )
    .await;
    let uri = format!("/api/song/{}", track["id"].as_str().unwrap());

    let (status, _) = delete(&app, &uri).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(count_rows(&pool, "track_artists").await, 0);
    assert_eq!(count_rows(&pool, "track_genres").await, 0);
    assert_eq!(count_rows(&pool, "artists").await, 1);

    let (status, _) = get(&app, &uri).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_multipart_track_uploads_audio_then_cover() {
    let audio = FakeUploader::new("https://audio.test/uploaded.mp3");
    let images = FakeUploader::new("https://img.test/uploaded.jpg");
    let (app, pool) = create_test_app_with(UploadServices::new(images.clone(), audio.clone())).await;
    let miles = seed_artist(&app, "Miles Davis").await;
    let trane = seed_artist(&app, "John Coltrane").await;
    let artist_list = format!("{},{}", miles, trane);

    let (status, track) = post_multipart(
        &app,
        "/api/song",
        &[
            Part::Text("title", "So What"),
            Part::Text("artistIds", &artist_list),
            Part::Text("duration", "562"),
            Part::File {
                name: "audio",
                file_name: "so what.mp3",
                content_type: "audio/mpeg",
                bytes: b"ID3 fake mp3",
            },
            Part::File {
                name: "cover",
                file_name: "cover.jpg",
                content_type: "image/jpeg",
                bytes: b"jpeg",
            },
        ],
    )
    .await;

    assert_eq!(status, StatusCode::CREATED, "{}", track);
    assert_eq!(track["audioUrl"], "https://audio.test/uploaded.mp3");
    assert_eq!(track["coverUrl"], "https://img.test/uploaded.jpg");
    assert_eq!(track["artists"].as_array().unwrap().len(), 2);
    assert_eq!(audio.calls(), 1);
    assert_eq!(images.calls(), 1);
    assert_eq!(count_rows(&pool, "tracks").await, 1);
}

#[tokio::test]
async fn test_multipart_track_upload_failure_leaves_no_row() {
    let (app, pool) =
        create_test_app_with(UploadServices::new(Arc::new(FailingUploader), Arc::new(FailingUploader))).await;
    let miles = seed_artist(&app, "Miles Davis").await;

    let (status, json) = post_multipart(
        &app,
        "/api/song",
        &[
            Part::Text("title", "So What"),
            Part::Text("artistIds[]", &miles),
            Part::File {
                name: "audio",
                file_name: "so-what.mp3",
                content_type: "audio/mpeg",
                bytes: b"ID3 fake mp3",
            },
        ],
    )
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(json["error"].as_str().unwrap().contains("upload"));
    assert_eq!(count_rows(&pool, "tracks").await, 0);
    assert_eq!(count_rows(&pool, "track_artists").await, 0);
}

#[tokio::test]
async fn test_multipart_track_validates_before_upload() {
    let audio = FakeUploader::new("https://audio.test/uploaded.mp3");
    let (app, pool) =
        create_test_app_with(UploadServices::new(FakeUploader::new("unused"), audio.clone())).await;
    let miles = seed_artist(&app, "Miles Davis").await;
    let mp3 = Part::File {
        name: "audio",
        file_name: "a.mp3",
        content_type: "audio/mpeg",
        bytes: b"ID3",
    };

    // No title
    let (status, _) = post_multipart(&app, "/api/song", &[Part::Text("artistIds", &miles), mp3]).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // No artists
    let mp3 = Part::File {
        name: "audio",
        file_name: "a.mp3",
        content_type: "audio/mpeg",
        bytes: b"ID3",
    };
    let (status, _) = post_multipart(&app, "/api/song", &[Part::Text("title", "x"), mp3]).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // No audio at all
    let (status, _) = post_multipart(
        &app,
        "/api/song",
        &[Part::Text("title", "x"), Part::Text("artistIds", &miles)],
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Image posted as the audio file
    let (status, _) = post_multipart(
        &app,
        "/api/song",
        &[
            Part::Text("title", "x"),
            Part::Text("artistIds", &miles),
            Part::File {
                name: "audio",
                file_name: "a.png",
                content_type: "image/png",
                bytes: b"png",
            },
        ],
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(audio.calls(), 0);
    assert_eq!(count_rows(&pool, "tracks").await, 0);
}
