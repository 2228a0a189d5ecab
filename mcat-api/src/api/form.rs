//! Request body extractors
//!
//! Create endpoints accept either a JSON document (files already uploaded,
//! URLs in the body) or a multipart form carrying the files themselves.

use axum::async_trait;
use axum::extract::{FromRequest, Multipart, Request};
use axum::http::header::CONTENT_TYPE;
use axum::Json;
use mcat_common::{uuid_utils, Error, Result};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::ApiError;
use crate::services::UploadFile;

/// JSON body whose rejection uses the API error body
#[derive(Debug)]
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> std::result::Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;
        Ok(JsonBody(value))
    }
}

/// Create payload: JSON or multipart, chosen by `Content-Type`
#[derive(Debug)]
pub enum Payload<T> {
    Json(T),
    Form(FormData),
}

fn is_multipart(req: &Request) -> bool {
    req.headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.trim_start().to_ascii_lowercase().starts_with("multipart/form-data"))
        .unwrap_or(false)
}

#[async_trait]
impl<S, T> FromRequest<S> for Payload<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> std::result::Result<Self, Self::Rejection> {
        if is_multipart(&req) {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| ApiError::BadRequest(e.body_text()))?;
            Ok(Payload::Form(FormData::read(multipart).await?))
        } else {
            let JsonBody(value) = JsonBody::<T>::from_request(req, state).await?;
            Ok(Payload::Json(value))
        }
    }
}

/// Text fields and files of a multipart form
///
/// Field names ending in `[]` are stored without the suffix, so
/// `artistIds[]=a&artistIds[]=b` and `artistIds=a,b` read the same.
#[derive(Debug, Default)]
pub struct FormData {
    fields: HashMap<String, Vec<String>>,
    files: HashMap<String, UploadFile>,
}

impl FormData {
    pub async fn read(mut multipart: Multipart) -> std::result::Result<Self, ApiError> {
        let mut form = FormData::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?
        {
            let name = field
                .name()
                .unwrap_or_default()
                .trim_end_matches("[]")
                .to_string();

            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let content_type = field.content_type().map(str::to_string);
                    let bytes = field
                        .bytes()
                        .await
                        .map_err(|e| ApiError::BadRequest(e.body_text()))?;

                    // Browsers send an empty part for a file input left blank
                    if file_name.is_empty() && bytes.is_empty() {
                        continue;
                    }

                    tracing::debug!(field = %name, file = %file_name, bytes = bytes.len(), "Received file");
                    form.files
                        .insert(name, UploadFile::new(file_name, content_type, bytes.to_vec()));
                }
                None => {
                    let text = field
                        .text()
                        .await
                        .map_err(|e| ApiError::BadRequest(e.body_text()))?;
                    form.fields.entry(name).or_default().push(text);
                }
            }
        }

        Ok(form)
    }

    /// First non-blank value of a text field
    pub fn text(&self, name: &str) -> Option<String> {
        self.fields
            .get(name)?
            .iter()
            .map(|v| v.trim())
            .find(|v| !v.is_empty())
            .map(str::to_string)
    }

    /// All values of a list field, split on commas
    pub fn list(&self, name: &str) -> Vec<String> {
        self.fields
            .get(name)
            .map(|values| {
                values
                    .iter()
                    .flat_map(|v| v.split(','))
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn take_file(&mut self, name: &str) -> Option<UploadFile> {
        self.files.remove(name)
    }

    #[cfg(test)]
    pub(crate) fn from_parts(fields: &[(&str, &str)]) -> Self {
        let mut form = FormData::default();
        for (name, value) in fields {
            form.fields
                .entry(name.to_string())
                .or_default()
                .push(value.to_string());
        }
        form
    }
}

/// Parse client-supplied ids; a malformed id cannot exist, so it is `NotFound`
pub fn parse_ids(values: &[String], entity: &str) -> Result<Vec<Uuid>> {
    values
        .iter()
        .map(|v| uuid_utils::parse_id(v, entity))
        .collect()
}

/// Optional id; blank means absent
pub fn parse_optional_id(value: Option<&str>, entity: &str) -> Result<Option<Uuid>> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => uuid_utils::parse_id(v, entity).map(Some),
        None => Ok(None),
    }
}

/// Seconds from a JSON number or form text; fractions are rounded
pub fn parse_duration(value: Option<&str>) -> Result<Option<i64>> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => v
            .parse::<f64>()
            .ok()
            .filter(|d| d.is_finite())
            .map(|d| Some(d.round() as i64))
            .ok_or_else(|| Error::InvalidInput(format!("duration must be a number (got '{}')", v))),
        None => Ok(None),
    }
}
