use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::core::telephony::TelephonyError;

/// Errors surfaced by the HTTP endpoints.
#[derive(Debug, Error)]
pub enum AppError {
    /// Request failed validation
    #[error("{0}")]
    BadRequest(String),

    /// An upstream provider rejected or failed the request
    #[error("{0}")]
    Upstream(String),

    /// Unexpected server-side failure
    #[error("{0}")]
    Internal(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<TelephonyError> for AppError {
    fn from(err: TelephonyError) -> Self {
        match err {
            TelephonyError::InvalidUrl(msg) => AppError::Internal(msg),
            other => AppError::Upstream(format!("Twilio error: {other}")),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(status = %status, "Request failed: {}", self);
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
