//! HTTP tests for /api/artist and /health

mod helpers;

use axum::http::StatusCode;
use helpers::*;
use mcat_api::services::UploadServices;
use serde_json::json;

#[tokio::test]
async fn test_health_endpoint() {
    let (app, _pool) = create_test_app().await;

    let (status, json) = get(&app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["module"], "mcat-api");
    assert!(json["uptimeSeconds"].is_u64());
    assert_eq!(json["database"], "ok");
    assert!(!json["revision"].as_str().unwrap().is_empty());
    assert_eq!(json["catalog"]["artists"], 0);
}

#[tokio::test]
async fn test_health_reports_catalog_and_database_loss() {
    let (app, pool) = create_test_app().await;
    seed_artist(&app, "Miles Davis").await;
    seed_genre(&app, "Jazz").await;

    let (_, json) = get(&app, "/health").await;
    assert_eq!(json["catalog"]["artists"], 1);
    assert_eq!(json["catalog"]["genres"], 1);
    assert_eq!(json["catalog"]["tracks"], 0);

    pool.close().await;
    let (status, json) = get(&app, "/health").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["status"], "unavailable");
    assert_eq!(json["database"], "unreachable");
    assert!(json.get("catalog").is_none());
}

#[tokio::test]
async fn test_create_and_fetch_artist() {
    let (app, _pool) = create_test_app().await;

    let (status, created) = post(
        &app,
        "/api/artist",
        json!({ "name": "  Miles Davis ", "bio": "Trumpeter", "image": "https://img.test/miles.png" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["name"], "Miles Davis");

    let id = created["id"].as_str().unwrap();
    let (status, detail) = get(&app, &format!("/api/artist/{}", id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["bio"], "Trumpeter");
    assert_eq!(detail["tracks"], json!([]));
    assert_eq!(detail["albums"], json!([]));
}

#[tokio::test]
async fn test_create_artist_requires_name() {
    let (app, pool) = create_test_app().await;

    let (status, json) = post(&app, "/api/artist", json!({ "name": "   " })).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("name"));
    assert_eq!(count_rows(&pool, "artists").await, 0);
}

#[tokio::test]
async fn test_malformed_json_uses_error_body() {
    let (app, _pool) = create_test_app().await;

    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/api/artist")
        .header("content-type", "application/json")
        .body(axum::body::Body::from("{not json"))
        .unwrap();
    let (status, json) = dispatch(&app, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].is_string());
}

#[tokio::test]
async fn test_unknown_and_malformed_ids_are_not_found() {
    let (app, _pool) = create_test_app().await;

    let (status, json) = get(&app, &format!("/api/artist/{}", uuid::Uuid::new_v4())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(json["error"].is_string());

    let (status, _) = get(&app, "/api/artist/not-a-uuid").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_artists_sorted_and_paginated() {
    let (app, _pool) = create_test_app().await;
    for name in ["Coltrane", "Basie", "Armstrong", "Davis", "Ellington"] {
        seed_artist(&app, name).await;
    }

    let (status, page) = get(&app, "/api/artist?page=1&limit=2").await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<_> = page["data"].as_array().unwrap().iter().map(|a| a["name"].clone()).collect();
    assert_eq!(names, vec![json!("Armstrong"), json!("Basie")]);
    assert_eq!(page["pagination"]["total"], 5);
    assert_eq!(page["pagination"]["totalPages"], 3);

    let (_, last) = get(&app, "/api/artist?page=3&limit=2").await;
    assert_eq!(last["data"].as_array().unwrap().len(), 1);

    let (_, past_end) = get(&app, "/api/artist?page=9&limit=2").await;
    assert_eq!(past_end["data"], json!([]));
    assert_eq!(past_end["pagination"]["page"], 9);

    let (_, desc) = get(&app, "/api/artist?sortBy=name&order=DESC&limit=1").await;
    assert_eq!(desc["data"][0]["name"], "Ellington");
}

#[tokio::test]
async fn test_invalid_list_parameters_are_rejected() {
    let (app, _pool) = create_test_app().await;

    for uri in [
        "/api/artist?sortBy=password",
        "/api/artist?order=sideways",
        "/api/artist?page=0",
        "/api/artist?limit=500",
        "/api/artist?page=abc",
    ] {
        let (status, json) = get(&app, uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        assert!(json["error"].is_string(), "{}", uri);
    }
}

#[tokio::test]
async fn test_search_artists_case_insensitive() {
    let (app, _pool) = create_test_app().await;
    seed_artist(&app, "Jazz Messengers").await;
    seed_artist(&app, "Rolling Stones").await;

    for term in ["jazz", "AZ", "Messeng"] {
        let (status, page) = get(&app, &format!("/api/artist/search?query={}", term)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(page["pagination"]["total"], 1, "{}", term);
        assert_eq!(page["data"][0]["name"], "Jazz Messengers");
    }

    let (status, _) = get(&app, "/api/artist/search").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_search_accepts_query_or_search_key() {
    let (app, _pool) = create_test_app().await;
    seed_artist(&app, "Jazz Messengers").await;
    seed_artist(&app, "Rolling Stones").await;

    let (status, page) = get(&app, "/api/artist/search?search=stones").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["data"][0]["name"], "Rolling Stones");

    let (status, page) = get(&app, "/api/artist/search?query=jazz&search=stones").await;
    assert_eq!(status, StatusCode::OK, "{}", page);
    assert_eq!(page["pagination"]["total"], 1);
    assert_eq!(page["data"][0]["name"], "Jazz Messengers");

    let (status, page) = get(&app, "/api/artist?search=rolling&query=").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["data"][0]["name"], "Rolling Stones");
}

#[tokio::test]
async fn test_update_artist_partial() {
    let (app, _pool) = create_test_app().await;
    let id = seed_artist(&app, "Nina").await;

    let (status, updated) = put(&app, &format!("/api/artist/{}", id), json!({ "bio": "Pianist" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["name"], "Nina");
    assert_eq!(updated["bio"], "Pianist");

    let (status, _) = put(&app, &format!("/api/artist/{}", id), json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_delete_artist() {
    let (app, pool) = create_test_app().await;
    let solo = seed_artist(&app, "Solo").await;
    let guest = seed_artist(&app, "Guest").await;
    seed_track(&app, "Duet", &[&solo, &guest]).await;

    let (status, _) = delete(&app, &format!("/api/artist/{}", solo)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    // Now the only credit on "Duet"
    let (status, _) = delete(&app, &format!("/api/artist/{}", guest)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(count_rows(&pool, "artists").await, 1);

    let (status, _) = delete(&app, &format!("/api/artist/{}", solo)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_multipart_artist_uploads_image() {
    let images = FakeUploader::new("https://img.test/uploaded.png");
    let (app, _pool) =
        create_test_app_with(UploadServices::new(images.clone(), FakeUploader::new("unused"))).await;

    let (status, created) = post_multipart(
        &app,
        "/api/artist",
        &[
            Part::Text("name", "Billie"),
            Part::File {
                name: "image",
                file_name: "billie.png",
                content_type: "image/png",
                bytes: b"\x89PNG fake",
            },
        ],
    )
    .await;

    assert_eq!(status, StatusCode::CREATED, "{}", created);
    assert_eq!(created["image"], "https://img.test/uploaded.png");
    assert_eq!(images.calls(), 1);
}

#[tokio::test]
async fn test_multipart_without_provider_is_unavailable() {
    let (app, pool) = create_test_app().await;

    let (status, json) = post_multipart(
        &app,
        "/api/artist",
        &[
            Part::Text("name", "Billie"),
            Part::File {
                name: "image",
                file_name: "billie.png",
                content_type: "image/png",
                bytes: b"\x89PNG fake",
            },
        ],
    )
    .await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(json["error"].as_str().unwrap().contains("not configured"));
    assert_eq!(count_rows(&pool, "artists").await, 0);
}
