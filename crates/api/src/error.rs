use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use picturebook_core::error::CoreError;
use picturebook_imagegen::ImageGenError;
use picturebook_pipeline::PipelineError;
use picturebook_storage::StorageError;
use picturebook_textgen::TextGenError;
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps the domain and provider errors and adds HTTP-specific variants.
/// Implements [`IntoResponse`] to produce `{ "error", "code" }` bodies.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    ImageGen(#[from] ImageGenError),

    #[error(transparent)]
    TextGen(#[from] TextGenError),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Core(e) => Self::Core(e),
            PipelineError::Storage(e) => Self::Storage(e),
            PipelineError::ImageGen(e) => Self::ImageGen(e),
            PipelineError::TextGen(e) => Self::TextGen(e),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Core(CoreError::Validation(errors.to_string()))
    }
}

fn internal(error: &dyn std::fmt::Display) -> (StatusCode, &'static str, String) {
    tracing::error!(error = %error, "Internal error");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::NotFound { entity, id } => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("{entity} with id {id} not found"),
                ),
                CoreError::Prerequisite { .. } => {
                    (StatusCode::BAD_REQUEST, "PREREQUISITE_MISSING", core.to_string())
                }
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                CoreError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
                CoreError::Internal(msg) => internal(msg),
            },

            // --- Storage ---
            AppError::Storage(StorageError::NotFound(what)) => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                format!("{what} not found"),
            ),
            AppError::Storage(StorageError::InvalidId(id)) => (
                StatusCode::BAD_REQUEST,
                "BAD_REQUEST",
                format!("Invalid id '{id}'"),
            ),
            AppError::Storage(other) => internal(other),

            // --- Providers ---
            AppError::TextGen(e @ TextGenError::MalformedResponse { .. }) => {
                tracing::warn!(error = %e, "Malformed structured response");
                (StatusCode::BAD_GATEWAY, "MALFORMED_RESPONSE", e.to_string())
            }
            AppError::TextGen(e) => {
                tracing::warn!(error = %e, "Text provider failure");
                (StatusCode::BAD_GATEWAY, "PROVIDER_ERROR", e.to_string())
            }
            AppError::ImageGen(e @ ImageGenError::UnsupportedAspectRatio(_)) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", e.to_string())
            }
            AppError::ImageGen(e) => {
                tracing::warn!(error = %e, "Image provider failure");
                (StatusCode::BAD_GATEWAY, "PROVIDER_ERROR", e.to_string())
            }

            // --- HTTP-specific errors ---
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::InternalError(msg) => internal(msg),
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}
