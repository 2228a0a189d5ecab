//! Error types for mcat-api
//!
//! Every failure leaves the service as a JSON body `{"error": "<message>"}`
//! with the status below. 5xx causes are logged at error level; the client
//! only sees a generic message for storage failures.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::services::UploadError;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("{0}")]
    BadRequest(String),

    /// Resource not found (404)
    #[error("{0}")]
    NotFound(String),

    /// Conflict (409), e.g. duplicate genre name
    #[error("{0}")]
    Conflict(String),

    /// Upload provider settings missing (503)
    #[error("{0}")]
    ServiceUnavailable(String),

    /// Upload provider failed (502)
    #[error("{0}")]
    BadGateway(String),

    /// Internal server error (500)
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<mcat_common::Error> for ApiError {
    fn from(err: mcat_common::Error) -> Self {
        use mcat_common::Error;

        match err {
            Error::InvalidInput(msg) => ApiError::BadRequest(msg),
            Error::NotFound(msg) => ApiError::NotFound(msg),
            Error::Conflict(msg) => ApiError::Conflict(msg),
            Error::Database(e) => {
                tracing::error!("Database error: {}", e);
                ApiError::Internal("Internal server error".to_string())
            }
            other => {
                tracing::error!("{}", other);
                ApiError::Internal("Internal server error".to_string())
            }
        }
    }
}

impl From<UploadError> for ApiError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::NotConfigured(_) => ApiError::ServiceUnavailable(err.to_string()),
            UploadError::InvalidFile(_) => ApiError::BadRequest(err.to_string()),
            UploadError::Rejected { .. } | UploadError::Network(_) | UploadError::InvalidResponse(_) => {
                tracing::error!("{}", err);
                ApiError::BadGateway(format!("File upload failed: {}", err))
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_client_error() {
            tracing::debug!(status = status.as_u16(), "{}", self);
        }

        let body = Json(json!({ "error": self.to_string() }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
