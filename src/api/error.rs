//! API error types with the frontend's JSON error contract.
//!
//! Every failure body has the shape `{"success": false, "error": "..."}`.
//! Bad uploads are 400-class; upstream generation failures map to 502 so
//! the frontend can distinguish "fix your photo" from "try again later".

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::service::TryOnError;

/// Error response body: the frontend's wire contract.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
}

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("invalid image: {0}")]
    InvalidImage(String),

    #[error("generation upstream failed: {0}")]
    Upstream(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::BadRequest(detail) => (StatusCode::BAD_REQUEST, detail.clone()),
            ApiError::InvalidImage(detail) => (StatusCode::BAD_REQUEST, detail.clone()),
            ApiError::Upstream(detail) => {
                tracing::error!(detail, "generation failed");
                (StatusCode::BAD_GATEWAY, detail.clone())
            }
            ApiError::Internal(detail) => {
                tracing::error!(detail, "API internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An error occurred during the virtual try-on process.".to_string(),
                )
            }
        };

        let body = ErrorBody {
            success: false,
            error: message,
        };

        (status, Json(body)).into_response()
    }
}

impl From<TryOnError> for ApiError {
    fn from(err: TryOnError) -> Self {
        match err {
            TryOnError::Preprocess(e) if e.is_input_error() => {
                tracing::warn!(error = %e, "preprocessing rejected upload");
                ApiError::InvalidImage(e.to_string())
            }
            TryOnError::Preprocess(e) => {
                tracing::error!(error = %e, "preprocessing failed");
                ApiError::Internal(e.to_string())
            }
            TryOnError::Generation(e) => ApiError::Upstream(e.to_string()),
        }
    }
}
