//! HTTP handlers, one submodule per resource.

pub mod images;
pub mod interactions;
pub mod posts;
pub mod users;

use std::{collections::HashMap, sync::Arc};

use axum::{extract::multipart::Field, Json};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    errors::AppError,
    models::AuthorSummary,
    AppState,
};

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// A file part read from a multipart form.
#[derive(Debug, Clone)]
pub(crate) struct UploadedImage {
    pub data: Vec<u8>,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
}

impl UploadedImage {
    pub(crate) async fn read(field: Field<'_>) -> Result<Self, AppError> {
        let file_name = field.file_name().map(|s| s.to_string());
        let content_type = field.content_type().map(|m| m.to_string());
        let data = field.bytes().await?.to_vec();
        Ok(Self { data, file_name, content_type })
    }

    /// Chooses the storage key `{prefix}/{id}.{ext}` and the content type to store.
    /// Rejects empty files and anything that is not an image.
    pub(crate) fn storage_target(&self, prefix: &str, id: Uuid) -> Result<(String, String), AppError> {
        if self.data.is_empty() {
            return Err(AppError::InvalidInput("image data cannot be empty".to_string()));
        }

        let extension = self
            .file_name
            .as_deref()
            .and_then(|name| name.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase()))
            .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
            .or_else(|| {
                self.content_type
                    .as_deref()
                    .and_then(mime_guess::get_mime_extensions_str)
                    .and_then(|exts| exts.first())
                    .map(|ext| ext.to_string())
            })
            .unwrap_or_else(|| "bin".to_string());
        let key = format!("{}/{}.{}", prefix, id, extension);

        let content_type = self
            .content_type
            .clone()
            .filter(|ct| ct != "application/octet-stream")
            .or_else(|| mime_guess::from_path(&key).first_raw().map(|s| s.to_string()))
            .unwrap_or_else(|| "application/octet-stream".to_string());

        if !content_type.starts_with("image/") {
            return Err(AppError::InvalidInput(format!(
                "Uploaded file must be an image, got '{}'",
                content_type
            )));
        }
        Ok((key, content_type))
    }
}

/// Looks up author summaries, hitting the repository once per distinct author.
pub(crate) struct AuthorCache<'a> {
    state: &'a Arc<AppState>,
    seen: HashMap<Uuid, AuthorSummary>,
}

impl<'a> AuthorCache<'a> {
    pub(crate) fn new(state: &'a Arc<AppState>) -> Self {
        Self { state, seen: HashMap::new() }
    }

    pub(crate) async fn get(&mut self, id: Uuid) -> Result<AuthorSummary, AppError> {
        if let Some(author) = self.seen.get(&id) {
            return Ok(author.clone());
        }
        let author = match self.state.users.get_by_id(id).await? {
            Some(user) => AuthorSummary::from(&user),
            None => {
                tracing::warn!(author_id = %id, "Author row missing, using placeholder");
                AuthorSummary::unknown(id)
            }
        };
        self.seen.insert(id, author.clone());
        Ok(author)
    }
}

/// Best-effort removal of a stored object nothing refers to anymore.
pub(crate) async fn discard_upload(state: &AppState, key: &str) {
    if let Err(e) = state.file_storage.delete(key).await {
        tracing::warn!(key = %key, error = ?e, "Failed to delete unreferenced object");
    }
}
