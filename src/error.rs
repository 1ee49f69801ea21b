use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

/// A single field-level validation complaint, in the shape the API
/// reports to clients: `{"msg": ..., "param": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub msg: String,
    pub param: String,
}

impl FieldError {
    pub fn new(msg: impl Into<String>, param: impl Into<String>) -> Self {
        Self {
            msg: msg.into(),
            param: param.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation failed")]
    Validation(Vec<FieldError>),

    #[error("Image upload failed: {0}")]
    MediaUpload(String),

    #[error("Image delete failed: {0}")]
    MediaDelete(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Validation(errors) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "errors": errors }))).into_response()
            }
            AppError::NotFound(msg) => {
                (StatusCode::NOT_FOUND, Json(json!({ "msg": msg }))).into_response()
            }
            AppError::MediaUpload(msg) => (
                StatusCode::BAD_GATEWAY,
                Json(json!({
                    "errors": [{
                        "msg": format!("Image failed to upload successfully because: {}", msg),
                        "param": "image",
                    }]
                })),
            )
                .into_response(),
            AppError::MediaDelete(msg) => (
                StatusCode::BAD_GATEWAY,
                Json(json!({
                    "errors": [{
                        "msg": format!("Image failed to delete successfully because: {}", msg),
                    }]
                })),
            )
                .into_response(),
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
            }
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
