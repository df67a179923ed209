//! JSON error responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use coffer_core::WalletError;
use serde_json::json;
use tracing::error;

/// Error returned by handlers, rendered as `{"error": code, "message": text}`.
#[derive(Debug)]
pub enum ApiError {
    /// An engine error; its status and code come from the error itself.
    Wallet(WalletError),
    /// Request input that failed to parse before reaching the engine.
    BadRequest {
        /// Error code.
        code: &'static str,
        /// Human-readable message.
        message: String,
    },
}

impl ApiError {
    /// Creates a bad request error.
    pub fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        Self::BadRequest {
            code,
            message: message.into(),
        }
    }
}

impl From<WalletError> for ApiError {
    fn from(err: WalletError) -> Self {
        Self::Wallet(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::Wallet(err) => {
                let status = StatusCode::from_u16(err.status_code())
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                let message = if status.is_server_error() {
                    error!(error = %err, code = err.error_code(), "Wallet operation failed");
                    "An internal error occurred".to_string()
                } else {
                    err.to_string()
                };
                (
                    status,
                    Json(json!({
                        "error": err.error_code(),
                        "message": message
                    })),
                )
                    .into_response()
            }
            Self::BadRequest { code, message } => (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "error": code,
                    "message": message
                })),
            )
                .into_response(),
        }
    }
}

/// Result type for handlers.
pub type ApiResult<T> = Result<T, ApiError>;
