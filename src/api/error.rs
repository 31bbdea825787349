//! API error handling for consistent JSON error responses.

use crate::recorder::RecorderError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// API error type that converts to JSON responses.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": true,
            "message": self.message,
        }));
        (self.status, body).into_response()
    }
}

impl From<RecorderError> for ApiError {
    fn from(err: RecorderError) -> Self {
        let message = err.to_string();
        match err {
            RecorderError::InvalidKey { .. } | RecorderError::UnsupportedPlatform { .. } => {
                Self::bad_request(message)
            }
            RecorderError::AlreadyRecording { .. } => Self::conflict(message),
            RecorderError::NotFound { .. } => Self::not_found(message),
            RecorderError::Directory { .. }
            | RecorderError::Spawn { .. }
            | RecorderError::Signal { .. } => Self::internal(message),
        }
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = Result<T, ApiError>;
