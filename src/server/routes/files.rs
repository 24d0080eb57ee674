use axum::{
    body::Body,
    extract::{Path, State},
    http::header,
    response::IntoResponse,
};
use tokio_util::io::ReaderStream;
use tracing::warn;

use crate::server::{error::ApiError, AppState};

/// Streams a managed artifact as an attachment.
pub async fn serve_file(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let path = state
        .coordinator
        .disk_store()
        .resolve(&filename)
        .ok_or_else(|| ApiError::NotFound(filename.clone()))?;

    // Puede haber sido desalojado entre resolve y open
    let file = tokio::fs::File::open(&path).await.map_err(|e| {
        warn!("⚠️ No se pudo abrir {}: {}", path.display(), e);
        ApiError::NotFound(filename.clone())
    })?;

    let headers = [
        (header::CONTENT_TYPE, content_type(&path)),
        (
            header::CONTENT_DISPOSITION,
            format!(
                "attachment; filename=\"{}\"",
                filename.replace(['"', '\\'], "_")
            ),
        ),
    ];

    Ok((headers, Body::from_stream(ReaderStream::new(file))))
}

fn content_type(path: &std::path::Path) -> String {
    mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}
