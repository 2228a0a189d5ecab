//! Test Helper Utilities
//!
//! In-memory app, fake upload providers and request shortcuts shared by the
//! HTTP tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use mcat_api::services::{AudioUploader, ImageUploader, UploadError, UploadFile, UploadServices};
use mcat_api::{build_router, AppState};
use serde_json::Value;
use sqlx::SqlitePool;
use tower::util::ServiceExt;

pub const BOUNDARY: &str = "mcat-test-boundary";

/// Uploader that returns a fixed URL and counts calls
#[derive(Default)]
pub struct FakeUploader {
    pub url: String,
    pub calls: AtomicUsize,
}

impl FakeUploader {
    pub fn new(url: &str) -> Arc<Self> {
        Arc::new(Self {
            url: url.to_string(),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageUploader for FakeUploader {
    async fn upload_image(&self, _file: UploadFile) -> Result<String, UploadError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.url.clone())
    }
}

#[async_trait]
impl AudioUploader for FakeUploader {
    async fn upload_audio(&self, _file: UploadFile) -> Result<String, UploadError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.url.clone())
    }
}

/// Uploader whose provider always refuses
pub struct FailingUploader;

#[async_trait]
impl ImageUploader for FailingUploader {
    async fn upload_image(&self, _file: UploadFile) -> Result<String, UploadError> {
        Err(UploadError::Rejected {
            status: 500,
            message: "storage unavailable".to_string(),
        })
    }
}

#[async_trait]
impl AudioUploader for FailingUploader {
    async fn upload_audio(&self, _file: UploadFile) -> Result<String, UploadError> {
        Err(UploadError::Rejected {
            status: 500,
            message: "storage unavailable".to_string(),
        })
    }
}

/// App over an in-memory database with no upload providers
pub async fn create_test_app() -> (Router, SqlitePool) {
    create_test_app_with(UploadServices::unconfigured()).await
}

pub async fn create_test_app_with(uploads: UploadServices) -> (Router, SqlitePool) {
    let pool = mcat_common::db::init_memory_database()
        .await
        .expect("Failed to create in-memory database");
    let state = AppState::new(pool.clone(), uploads, 10 * 1024 * 1024);
    (build_router(state), pool)
}

/// Send a request and decode the JSON reply (`Null` for an empty body)
pub async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    dispatch(app, request).await
}

pub async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, "GET", uri, None).await
}

pub async fn post(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(app, "POST", uri, Some(body)).await
}

pub async fn put(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(app, "PUT", uri, Some(body)).await
}

pub async fn delete(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, "DELETE", uri, None).await
}

pub async fn dispatch(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            panic!("non-JSON body: {}", String::from_utf8_lossy(&bytes))
        })
    };
    (status, json)
}

/// One part of a multipart body
pub enum Part<'a> {
    Text(&'a str, &'a str),
    File {
        name: &'a str,
        file_name: &'a str,
        content_type: &'a str,
        bytes: &'a [u8],
    },
}

pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n", name, value)
                        .as_bytes(),
                );
            }
            Part::File {
                name,
                file_name,
                content_type,
                bytes,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                        name, file_name, content_type
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
                body.extend_from_slice(b"\r\n");
            }
        }
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub async fn post_multipart(app: &Router, uri: &str, parts: &[Part<'_>]) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap();
    dispatch(app, request).await
}

/// Create an artist over HTTP and return its id
pub async fn seed_artist(app: &Router, name: &str) -> String {
    let (status, json) = post(app, "/api/artist", serde_json::json!({ "name": name })).await;
    assert_eq!(status, StatusCode::CREATED, "{}", json);
    json["id"].as_str().unwrap().to_string()
}

pub async fn seed_album(app: &Router, title: &str, release_date: &str) -> String {
    let (status, json) = post(
        app,
        "/api/album",
        serde_json::json!({ "title": title, "releaseDate": release_date }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", json);
    json["id"].as_str().unwrap().to_string()
}

pub async fn seed_genre(app: &Router, name: &str) -> String {
    let (status, json) = post(
        app,
        "/api/genre",
        serde_json::json!({ "name": name, "image": format!("https://img.test/{}.png", name) }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", json);
    json["id"].as_str().unwrap().to_string()
}

pub async fn seed_track(app: &Router, title: &str, artist_ids: &[&str]) -> String {
    let (status, json) = post(
        app,
        "/api/song",
        serde_json::json!({
            "title": title,
            "artistIds": artist_ids,
            "audioUrl": format!("https://audio.test/{}.mp3", title),
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", json);
    json["id"].as_str().unwrap().to_string()
}

pub async fn count_rows(pool: &SqlitePool, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
        .fetch_one(pool)
        .await
        .unwrap()
}
