use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::server::{error::ApiError, AppState};

#[derive(Debug, Deserialize)]
pub struct DownloadParams {
    pub id: Option<String>,
    pub format: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DownloadResponse {
    pub message: &'static str,
    pub filename: String,
    /// Where `GET /file/{filename}` serves the artifact.
    #[serde(rename = "url")]
    pub retrieval_url: String,
}

pub async fn download(
    State(state): State<AppState>,
    Query(params): Query<DownloadParams>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = state
        .coordinator
        .download(params.id.as_deref(), params.format.as_deref())
        .await?;

    Ok(Json(DownloadResponse {
        message: outcome.status.message(),
        retrieval_url: outcome.retrieval_url(),
        filename: outcome.filename,
    }))
}
