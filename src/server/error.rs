use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::error::FetchError;

#[derive(Error, Debug, Clone, Serialize)]
pub enum ApiError {
    #[error("{0}")]
    ValidationError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("{error}")]
    Internal {
        error: String,
        details: Option<String>,
    },
}

impl From<FetchError> for ApiError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Validation(msg) => Self::ValidationError(msg),
            FetchError::SearchFailed(detail) => Self::Internal {
                error: "Search failed".to_string(),
                details: Some(detail),
            },
            FetchError::ExtractionFailed(e) => Self::Internal {
                error: "Download failed".to_string(),
                details: Some(e.to_string()),
            },
            FetchError::ExtractionOutputUnparseable => Self::Internal {
                error: "Could not detect output filename".to_string(),
                details: None,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            Self::ValidationError(error) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse {
                    error,
                    details: None,
                },
            ),
            Self::NotFound(error) => (
                StatusCode::NOT_FOUND,
                ErrorResponse {
                    error,
                    details: None,
                },
            ),
            Self::Internal { error, details } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse { error, details },
            ),
        };

        (status, Json(body)).into_response()
    }
}

#[derive(Serialize, Debug)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}
