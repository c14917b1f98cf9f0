//! Error types for the glance app.

use axum::Json;
use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::config::ConfigError;

/// Result type alias for app operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Errors raised outside the analysis pipeline itself.
///
/// Analysis failures never surface here; they are reported inside the
/// analysis view.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Loading or saving configuration failed.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Configuration is unusable.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Library error while wiring up the pipeline.
    #[error(transparent)]
    Glance(#[from] glance::Error),

    /// Multipart body could not be read.
    #[error("Upload failed: {0}")]
    Upload(#[from] MultipartError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// Create an invalid configuration error.
    #[must_use]
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// HTTP status for this error.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Upload(e) => e.status(),
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, "client error");
        }
        (status, Json(json!({ "message": self.to_string() }))).into_response()
    }
}
