//! Request-level errors and their HTTP mapping. Every body is `{"detail": ...}`.

use crate::features::FieldError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing, empty and wrong keys all land here.
    #[error("Invalid API key")]
    Unauthorized,
    #[error("Invalid model name: {0}")]
    InvalidModel(String),
    #[error("Model not loaded: {0}")]
    ModelNotLoaded(String),
    #[error("request validation failed")]
    Validation(Vec<FieldError>),
    #[error("model {model} returned class index {index} outside the label table")]
    LabelOutOfRange { model: String, index: usize },
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::InvalidModel(_) | ApiError::ModelNotLoaded(_) => StatusCode::BAD_REQUEST,
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::LabelOutOfRange { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "model/label mismatch");
        }
        let detail = match self {
            ApiError::Validation(errors) => json!(errors),
            ApiError::LabelOutOfRange { .. } => json!("Internal server error"),
            other => json!(other.to_string()),
        };
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}
