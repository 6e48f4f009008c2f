use axum::extract::rejection::{BytesRejection, PathRejection, QueryRejection};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::store::StoreError;

/// Message returned for failures that carry no classification.
pub const UNKNOWN_ERROR_MESSAGE: &str = "unknown error occurred";

/// Application-wide error types with their HTTP status codes.
///
/// Every classified variant maps to exactly one status and its message is
/// safe to show to clients. `Unclassified` wraps anything else; its detail is
/// logged but never sent over the wire.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    PayloadTooLarge(String),

    #[error("{0}")]
    TooManyRequests(String),

    #[error("{0}")]
    Internal(String),

    #[error(transparent)]
    Unclassified(#[from] anyhow::Error),
}

/// Error response body for API endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Failure details attached to error responses as an extension.
///
/// Request tracking reads this to log the cause and status without
/// re-parsing the body.
#[derive(Debug, Clone)]
pub struct HandlerFailure {
    pub message: String,
    pub status: StatusCode,
}

impl AppError {
    /// Shorthand for a 400 built from a JSON decode failure.
    pub fn decode(err: &serde_json::Error) -> Self {
        AppError::BadRequest(sanitize_serde_error(err))
    }

    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::TooManyRequests(_) => StatusCode::TOO_MANY_REQUESTS,
            AppError::Internal(_) | AppError::Unclassified(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Client-facing body and status for this error.
    pub fn error_info(&self) -> (ErrorResponse, StatusCode) {
        let error = match self {
            AppError::Unclassified(_) => UNKNOWN_ERROR_MESSAGE.to_string(),
            classified => classified.to_string(),
        };
        (ErrorResponse { error }, self.status())
    }

    fn log_message(&self) -> String {
        match self {
            AppError::Unclassified(e) => format!("{e:#}"),
            classified => classified.to_string(),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        if err.is_not_found() {
            AppError::NotFound(err.to_string())
        } else {
            AppError::Internal(err.to_string())
        }
    }
}

// =============================================================================
// Extractor Rejections
// =============================================================================
//
// Axum's built-in rejections render as plain text. These conversions route
// them through `AppError` so every failure shares the JSON body.

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        if rejection.status().is_server_error() {
            return AppError::Internal(rejection.body_text());
        }
        tracing::debug!(detail = %rejection.body_text(), "Rejected request path");
        AppError::BadRequest("invalid id in request path".to_string())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        tracing::debug!(detail = %rejection.body_text(), "Rejected query string");
        AppError::BadRequest("invalid query string".to_string())
    }
}

impl From<BytesRejection> for AppError {
    fn from(rejection: BytesRejection) -> Self {
        match rejection.status() {
            StatusCode::PAYLOAD_TOO_LARGE => {
                AppError::PayloadTooLarge("request body too large".to_string())
            }
            status if status.is_server_error() => AppError::Internal(rejection.body_text()),
            _ => {
                tracing::debug!(detail = %rejection.body_text(), "Failed to read request body");
                AppError::BadRequest("failed to read request body".to_string())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (body, status) = self.error_info();

        let mut response = match serde_json::to_vec(&body) {
            Ok(bytes) => (
                status,
                [(
                    header::CONTENT_TYPE,
                    HeaderValue::from_static("application/json"),
                )],
                bytes,
            )
                .into_response(),
            Err(e) => {
                // The status has already been decided; only the body is lost
                tracing::error!(error = %e, status = %status, "Failed to encode error response");
                status.into_response()
            }
        };

        response.extensions_mut().insert(HandlerFailure {
            message: self.log_message(),
            status,
        });
        response
    }
}

/// Sanitize serde error messages to avoid leaking internal type information.
///
/// Serde errors can contain internal struct/field names which shouldn't be
/// exposed to external clients. This function extracts the useful parts.
pub fn sanitize_serde_error(e: &serde_json::Error) -> String {
    let msg = e.to_string();

    if msg.contains("missing field")
        && let Some(field) = backticked(&msg)
    {
        return format!("missing required field: {field}");
    }

    if msg.contains("unknown field")
        && let Some(field) = backticked(&msg)
    {
        return format!("unknown field: {field}");
    }

    if msg.contains("invalid type") {
        return "invalid data type in request body".to_string();
    }

    if msg.contains("EOF while parsing") || msg.contains("expected") {
        return "malformed JSON in request body".to_string();
    }

    "invalid request format".to_string()
}

fn backticked(msg: &str) -> Option<&str> {
    let (_, rest) = msg.split_once('`')?;
    let (field, _) = rest.split_once('`')?;
    Some(field)
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
