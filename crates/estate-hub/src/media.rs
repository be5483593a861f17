//! Image uploads and the `/media` route that serves them back.

use std::path::PathBuf;

use axum::extract::multipart::MultipartRejection;
use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tracing::{info, warn};

use crate::auth::AuthUser;
use crate::http::{ApiError, AppContext};
use crate::store::new_id;

#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("media storage failed: {0}")]
    Io(#[from] std::io::Error),
}

impl From<MediaError> for ApiError {
    fn from(err: MediaError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredImage {
    pub name: String,
    pub url: String,
    pub content_type: String,
    pub size: usize,
}

/// Where uploaded images live. The default keeps them in a local directory.
#[axum::async_trait]
pub trait ImageStore: Send + Sync {
    async fn save(&self, extension: &str, content_type: &str, bytes: Vec<u8>)
        -> Result<StoredImage, MediaError>;

    /// `Ok(None)` for unknown or malformed names.
    async fn load(&self, name: &str) -> Result<Option<Vec<u8>>, MediaError>;
}

pub struct LocalImageStore {
    root: PathBuf,
    public_url: String,
}

impl LocalImageStore {
    pub fn new(root: PathBuf, public_url: String) -> Self {
        Self {
            root,
            public_url: public_url.trim_end_matches('/').to_string(),
        }
    }
}

/// Generated names are `<uuid>.<ext>`; anything else never touches the filesystem.
fn is_safe_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && !name.contains("..")
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
}

#[axum::async_trait]
impl ImageStore for LocalImageStore {
    async fn save(
        &self,
        extension: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<StoredImage, MediaError> {
        tokio::fs::create_dir_all(&self.root).await?;
        let name = format!("{}.{}", new_id(), extension);
        let size = bytes.len();
        tokio::fs::write(self.root.join(&name), bytes).await?;
        Ok(StoredImage {
            url: format!("{}/{}", self.public_url, name),
            name,
            content_type: content_type.to_string(),
            size,
        })
    }

    async fn load(&self, name: &str) -> Result<Option<Vec<u8>>, MediaError> {
        if !is_safe_name(name) {
            return Ok(None);
        }
        match tokio::fs::read(self.root.join(name)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route(
            "/api/uploads",
            post(upload_handler).layer(DefaultBodyLimit::disable()),
        )
        .route("/media/:name", get(serve_handler))
}

/// Raster formats browsers render inertly. SVG is excluded since it can carry script.
fn is_raster(mime: &mime::Mime) -> bool {
    mime.type_() == mime::IMAGE
        && matches!(mime.subtype().as_str(), "jpeg" | "png" | "gif" | "webp")
}

/// Accepts a file name only when it maps to a raster image type.
fn image_type(file_name: &str) -> Result<(String, String), ApiError> {
    let guess = mime_guess::from_path(file_name).first();
    let extension = std::path::Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match (guess, extension) {
        (Some(mime), Some(extension)) if is_raster(&mime) => {
            Ok((extension, mime.essence_str().to_string()))
        }
        _ => Err(ApiError::UnsupportedMedia(format!(
            "'{}' is not a supported image type",
            file_name
        ))),
    }
}

pub(crate) async fn upload_handler(
    State(ctx): State<AppContext>,
    caller: AuthUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ApiError> {
    let mut multipart = multipart.map_err(|err| ApiError::BadRequest(err.body_text()))?;
    let limit = ctx.max_upload_bytes;

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|err| ApiError::BadRequest(err.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let (extension, content_type) = image_type(&file_name)?;

        let mut bytes = Vec::new();
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|err| ApiError::BadRequest(err.body_text()))?
        {
            if bytes.len() + chunk.len() > limit {
                warn!(user = %caller.id, file = %file_name, limit, "upload rejected: too large");
                return Err(ApiError::PayloadTooLarge { limit });
            }
            bytes.extend_from_slice(&chunk);
        }
        if bytes.is_empty() {
            return Err(ApiError::BadRequest("uploaded file is empty".to_string()));
        }

        let stored = ctx.media.save(&extension, &content_type, bytes).await?;
        info!(user = %caller.id, name = %stored.name, size = stored.size, "image uploaded");
        return Ok((StatusCode::CREATED, Json(stored)).into_response());
    }

    Err(ApiError::BadRequest("multipart field 'file' is required".to_string()))
}

pub(crate) async fn serve_handler(
    State(ctx): State<AppContext>,
    Path(name): Path<String>,
) -> Result<Response, ApiError> {
    let bytes = ctx
        .media
        .load(&name)
        .await?
        .ok_or_else(|| ApiError::not_found("media", name.as_str()))?;
    let content_type = mime_guess::from_path(&name)
        .first()
        .filter(is_raster)
        .unwrap_or(mime::APPLICATION_OCTET_STREAM)
        .essence_str()
        .to_string();
    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (header::CACHE_CONTROL, "public, max-age=86400".to_string()),
            (header::X_CONTENT_TYPE_OPTIONS, "nosniff".to_string()),
        ],
        bytes,
    )
        .into_response())
}
