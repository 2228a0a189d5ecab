//! Upload collaborators
//!
//! Cover art and pictures go to an image CDN, audio files to an object
//! storage bucket. Both are external services; this module only adapts their
//! HTTP APIs to two small traits so handlers (and tests) can swap them.

pub mod cloudinary;
pub mod firebase;

pub use cloudinary::CloudinaryImageUploader;
pub use firebase::FirebaseAudioUploader;

use async_trait::async_trait;
use mcat_common::config::UploadsConfig;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

/// Request timeout for upload calls (audio files can be large)
pub const UPLOAD_TIMEOUT: Duration = Duration::from_secs(60);

/// Upload failures
#[derive(Debug, Error)]
pub enum UploadError {
    /// Provider settings are missing
    #[error("{0} uploads are not configured")]
    NotConfigured(&'static str),

    /// Empty file or wrong content type
    #[error("Invalid file: {0}")]
    InvalidFile(String),

    /// Provider answered with a non-success status
    #[error("Upload rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Upload network error: {0}")]
    Network(String),

    /// Provider answered but the reply lacked the URL
    #[error("Unexpected upload response: {0}")]
    InvalidResponse(String),
}

/// One file received from a client
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(file_name: impl Into<String>, content_type: Option<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type,
            bytes,
        }
    }

    /// Reject empty files and declared content types outside `expected/*`
    ///
    /// `application/octet-stream` counts as undeclared.
    pub fn validate(&self, expected: &str) -> Result<(), UploadError> {
        if self.bytes.is_empty() {
            return Err(UploadError::InvalidFile(format!(
                "{} is empty",
                self.display_name()
            )));
        }

        if let Some(content_type) = self.content_type.as_deref() {
            let declared = content_type.to_ascii_lowercase();
            if declared != "application/octet-stream"
                && !declared.starts_with(&format!("{}/", expected))
            {
                return Err(UploadError::InvalidFile(format!(
                    "{} has content type {}, expected {}/*",
                    self.display_name(),
                    content_type,
                    expected
                )));
            }
        }

        Ok(())
    }

    /// File name reduced to characters safe in an object path
    pub fn safe_file_name(&self) -> String {
        let cleaned: String = self
            .file_name
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                    c
                } else {
                    '_'
                }
            })
            .collect();

        if cleaned.trim_matches(|c| c == '.' || c == '_').is_empty() {
            "upload".to_string()
        } else {
            cleaned
        }
    }

    fn display_name(&self) -> &str {
        if self.file_name.is_empty() {
            "file"
        } else {
            &self.file_name
        }
    }
}

/// Stores images and returns their public URL
#[async_trait]
pub trait ImageUploader: Send + Sync {
    async fn upload_image(&self, file: UploadFile) -> Result<String, UploadError>;
}

/// Stores audio files and returns a long-lived download URL
#[async_trait]
pub trait AudioUploader: Send + Sync {
    async fn upload_audio(&self, file: UploadFile) -> Result<String, UploadError>;
}

/// Stand-in for a provider with no settings
pub struct UnconfiguredUploader;

#[async_trait]
impl ImageUploader for UnconfiguredUploader {
    async fn upload_image(&self, _file: UploadFile) -> Result<String, UploadError> {
        Err(UploadError::NotConfigured("Image"))
    }
}

#[async_trait]
impl AudioUploader for UnconfiguredUploader {
    async fn upload_audio(&self, _file: UploadFile) -> Result<String, UploadError> {
        Err(UploadError::NotConfigured("Audio"))
    }
}

/// Image and audio collaborators held in application state
#[derive(Clone)]
pub struct UploadServices {
    pub image: Arc<dyn ImageUploader>,
    pub audio: Arc<dyn AudioUploader>,
}

impl UploadServices {
    pub fn new(image: Arc<dyn ImageUploader>, audio: Arc<dyn AudioUploader>) -> Self {
        Self { image, audio }
    }

    /// Neither provider available; JSON requests carrying URLs still work
    pub fn unconfigured() -> Self {
        Self::new(Arc::new(UnconfiguredUploader), Arc::new(UnconfiguredUploader))
    }

    /// Build clients for every configured provider
    pub fn from_config(config: &UploadsConfig) -> Result<Self, UploadError> {
        let image: Arc<dyn ImageUploader> = match CloudinaryImageUploader::from_config(&config.image)? {
            Some(uploader) => {
                info!("Image uploads: enabled");
                Arc::new(uploader)
            }
            None => {
                info!("Image uploads: not configured");
                Arc::new(UnconfiguredUploader)
            }
        };

        let audio: Arc<dyn AudioUploader> = match FirebaseAudioUploader::from_config(&config.audio)? {
            Some(uploader) => {
                info!("Audio uploads: enabled");
                Arc::new(uploader)
            }
            None => {
                info!("Audio uploads: not configured");
                Arc::new(UnconfiguredUploader)
            }
        };

        Ok(Self::new(image, audio))
    }
}

/// Shared reqwest client builder for upload providers
fn http_client() -> Result<reqwest::Client, UploadError> {
    reqwest::Client::builder()
        .user_agent(concat!("mcat/", env!("CARGO_PKG_VERSION")))
        .timeout(UPLOAD_TIMEOUT)
        .build()
        .map_err(|e| UploadError::Network(e.to_string()))
}

/// Turn a non-success reply into `Rejected`
async fn rejection(response: reqwest::Response) -> UploadError {
    let status = response.status().as_u16();
    let message = response.text().await.unwrap_or_default();
    UploadError::Rejected { status, message }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str, content_type: Option<&str>, bytes: &[u8]) -> UploadFile {
        UploadFile::new(name, content_type.map(str::to_string), bytes.to_vec())
    }

    #[test]
    fn test_validate_rejects_empty_file() {
        let err = file("a.png", Some("image/png"), b"").validate("image").unwrap_err();
        assert!(matches!(err, UploadError::InvalidFile(_)));
    }

    #[test]
    fn test_validate_checks_declared_type() {
        assert!(file("a.png", Some("image/png"), b"x").validate("image").is_ok());
        assert!(file("a.mp3", Some("audio/mpeg"), b"x").validate("image").is_err());
        assert!(file("a.mp3", Some("Audio/MPEG"), b"x").validate("audio").is_ok());
        assert!(file("a.bin", Some("application/octet-stream"), b"x").validate("audio").is_ok());
        assert!(file("a", None, b"x").validate("audio").is_ok());
    }

    #[test]
    fn test_safe_file_name() {
        assert_eq!(file("My Song (live).mp3", None, b"x").safe_file_name(), "My_Song__live_.mp3");
        assert_eq!(file("", None, b"x").safe_file_name(), "upload");
        assert_eq!(file("../..", None, b"x").safe_file_name(), "upload");
    }

    #[tokio::test]
    async fn test_unconfigured_uploader_fails() {
        let services = UploadServices::unconfigured();
        let err = services
            .audio
            .upload_audio(file("a.mp3", Some("audio/mpeg"), b"x"))
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::NotConfigured("Audio")));
    }
}
