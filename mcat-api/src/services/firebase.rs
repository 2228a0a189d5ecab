//! Object storage client for audio files
//!
//! Uses the storage REST API: the raw bytes are POSTed to
//! `{base}/v0/b/{bucket}/o?name={object}` and the returned download token is
//! turned into a `?alt=media&token=` URL. Token URLs stay valid until the
//! token is revoked, so stored track URLs do not expire.

use async_trait::async_trait;
use mcat_common::config::AudioUploadConfig;
use reqwest::Url;
use serde::Deserialize;
use uuid::Uuid;

use super::{http_client, rejection, AudioUploader, UploadError, UploadFile};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObjectResponse {
    name: Option<String>,
    /// Comma-separated when several tokens exist
    download_tokens: Option<String>,
}

pub struct FirebaseAudioUploader {
    http_client: reqwest::Client,
    base_url: String,
    bucket: String,
    access_token: Option<String>,
    folder: String,
}

impl FirebaseAudioUploader {
    /// `None` when no bucket is set
    pub fn from_config(config: &AudioUploadConfig) -> Result<Option<Self>, UploadError> {
        let Some(bucket) = config.bucket.as_deref().filter(|b| !b.trim().is_empty()) else {
            return Ok(None);
        };

        Ok(Some(Self {
            http_client: http_client()?,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            bucket: bucket.trim().to_string(),
            access_token: config
                .access_token
                .clone()
                .filter(|t| !t.trim().is_empty()),
            folder: config.folder.trim_matches('/').to_string(),
        }))
    }

    /// `{folder}/{uuid}-{file name}`, unique per upload
    fn object_name(&self, file: &UploadFile) -> String {
        let unique = format!("{}-{}", Uuid::new_v4(), file.safe_file_name());
        if self.folder.is_empty() {
            unique
        } else {
            format!("{}/{}", self.folder, unique)
        }
    }

    fn upload_url(&self, object_name: &str) -> Result<Url, UploadError> {
        let mut url = self.object_collection_url()?;
        url.query_pairs_mut().append_pair("name", object_name);
        Ok(url)
    }

    fn download_url(&self, object_name: &str, token: &str) -> Result<Url, UploadError> {
        let mut url = self.object_collection_url()?;
        url.path_segments_mut()
            .map_err(|_| UploadError::InvalidResponse("storage base URL cannot hold a path".to_string()))?
            .push(object_name);
        url.query_pairs_mut()
            .append_pair("alt", "media")
            .append_pair("token", token);
        Ok(url)
    }

    /// `{base}/v0/b/{bucket}/o`
    fn object_collection_url(&self) -> Result<Url, UploadError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| UploadError::InvalidResponse(format!("storage base URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| UploadError::InvalidResponse("storage base URL cannot hold a path".to_string()))?
            .pop_if_empty()
            .extend(["v0", "b", self.bucket.as_str(), "o"]);
        Ok(url)
    }
}

#[async_trait]
impl AudioUploader for FirebaseAudioUploader {
    async fn upload_audio(&self, file: UploadFile) -> Result<String, UploadError> {
        file.validate("audio")?;

        let object_name = self.object_name(&file);
        let content_type = file
            .content_type
            .clone()
            .unwrap_or_else(|| "application/octet-stream".to_string());
        let size = file.bytes.len();

        tracing::debug!(object = %object_name, bytes = size, "Uploading audio");

        let mut request = self
            .http_client
            .post(self.upload_url(&object_name)?)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(file.bytes);
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| UploadError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(rejection(response).await);
        }

        let object: ObjectResponse = response
            .json()
            .await
            .map_err(|e| UploadError::InvalidResponse(e.to_string()))?;

        let token = object
            .download_tokens
            .as_deref()
            .and_then(|tokens| tokens.split(',').map(str::trim).find(|t| !t.is_empty()))
            .ok_or_else(|| UploadError::InvalidResponse("missing downloadTokens".to_string()))?;
        let stored_name = object.name.as_deref().unwrap_or(&object_name);

        let url = self.download_url(stored_name, token)?.to_string();
        tracing::info!(object = %stored_name, "Audio uploaded");
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uploader() -> FirebaseAudioUploader {
        let config = AudioUploadConfig {
            bucket: Some("catalog.appspot.com".to_string()),
            ..Default::default()
        };
        FirebaseAudioUploader::from_config(&config).unwrap().unwrap()
    }

    #[test]
    fn test_from_config_requires_bucket() {
        assert!(FirebaseAudioUploader::from_config(&AudioUploadConfig::default())
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_object_name_is_unique_and_folded() {
        let file = UploadFile::new("So What.mp3", None, vec![1]);
        let up = uploader();

        let a = up.object_name(&file);
        let b = up.object_name(&file);
        assert!(a.starts_with("tracks/"));
        assert!(a.ends_with("-So_What.mp3"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_upload_url() {
        let url = uploader().upload_url("tracks/x.mp3").unwrap();
        assert_eq!(
            url.as_str(),
            "https://firebasestorage.googleapis.com/v0/b/catalog.appspot.com/o?name=tracks%2Fx.mp3"
        );
    }

    #[test]
    fn test_download_url_encodes_object_path() {
        let url = uploader().download_url("tracks/x.mp3", "tok-1").unwrap();
        assert_eq!(
            url.as_str(),
            "https://firebasestorage.googleapis.com/v0/b/catalog.appspot.com/o/tracks%2Fx.mp3?alt=media&token=tok-1"
        );
    }
}
