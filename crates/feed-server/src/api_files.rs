//! Log file downloads.

use crate::api::ApiError;
use crate::AppState;
use axum::{
    extract::{Extension, Path},
    http::header,
    response::{IntoResponse, Response},
};
use std::path::{Component, Path as FsPath};
use std::sync::Arc;

/// Accepts only a single normal path component.
fn is_safe_filename(name: &str) -> bool {
    if name.is_empty() || name.contains('/') || name.contains('\\') {
        return false;
    }
    let mut components = FsPath::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// Handler for `GET /api/files/{filename}`.
pub async fn download_file_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(filename): Path<String>,
) -> Result<Response, ApiError> {
    if !is_safe_filename(&filename) {
        tracing::warn!(filename = %filename, "rejected file download with unsafe name");
        return Err(ApiError::BadRequest("invalid filename".to_string()));
    }

    let path = state.files_dir.join(&filename);
    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ApiError::NotFound(format!("file {:?} does not exist", filename)));
        }
        Err(e) => {
            tracing::error!(path = %path.display(), "failed to read file: {}", e);
            return Err(ApiError::InternalServerError(
                "failed to read file".to_string(),
            ));
        }
    };

    tracing::info!(filename = %filename, size = bytes.len(), "serving file download");

    Ok((
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        bytes,
    )
        .into_response())
}
