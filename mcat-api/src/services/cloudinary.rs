//! Image CDN client (unsigned uploads)
//!
//! `POST {base}/v1_1/{cloud_name}/image/upload` with a multipart body holding
//! `file`, `upload_preset` and `folder`. The reply carries `secure_url`.

use async_trait::async_trait;
use mcat_common::config::ImageUploadConfig;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;

use super::{http_client, rejection, ImageUploader, UploadError, UploadFile};

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: Option<String>,
}

pub struct CloudinaryImageUploader {
    http_client: reqwest::Client,
    endpoint: String,
    upload_preset: String,
    folder: String,
}

impl CloudinaryImageUploader {
    /// `None` when the cloud name or preset is missing
    pub fn from_config(config: &ImageUploadConfig) -> Result<Option<Self>, UploadError> {
        if !config.is_configured() {
            return Ok(None);
        }

        let (Some(cloud_name), Some(upload_preset)) =
            (config.cloud_name.as_deref(), config.upload_preset.as_deref())
        else {
            return Ok(None);
        };

        Ok(Some(Self {
            http_client: http_client()?,
            endpoint: upload_endpoint(&config.api_base_url, cloud_name),
            upload_preset: upload_preset.trim().to_string(),
            folder: config.folder.clone(),
        }))
    }
}

fn upload_endpoint(base_url: &str, cloud_name: &str) -> String {
    format!(
        "{}/v1_1/{}/image/upload",
        base_url.trim_end_matches('/'),
        cloud_name.trim()
    )
}

#[async_trait]
impl ImageUploader for CloudinaryImageUploader {
    async fn upload_image(&self, file: UploadFile) -> Result<String, UploadError> {
        file.validate("image")?;

        let size = file.bytes.len();
        let file_name = file.safe_file_name();
        let mut part = Part::bytes(file.bytes).file_name(file_name.clone());
        if let Some(content_type) = file.content_type.as_deref() {
            part = part
                .mime_str(content_type)
                .map_err(|e| UploadError::InvalidFile(e.to_string()))?;
        }

        let form = Form::new()
            .part("file", part)
            .text("upload_preset", self.upload_preset.clone())
            .text("folder", self.folder.clone());

        tracing::debug!(file = %file_name, bytes = size, "Uploading image");

        let response = self
            .http_client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|e| UploadError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(rejection(response).await);
        }

        let body: UploadResponse = response
            .json()
            .await
            .map_err(|e| UploadError::InvalidResponse(e.to_string()))?;

        let url = body
            .secure_url
            .ok_or_else(|| UploadError::InvalidResponse("missing secure_url".to_string()))?;

        tracing::info!(file = %file_name, url = %url, "Image uploaded");
        Ok(url)
    }
}
