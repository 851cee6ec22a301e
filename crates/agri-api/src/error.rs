//! API error types and JSON error response formatting.
//!
//! Every failure leaves the boundary as `{error, message}` with a matching
//! HTTP status code.

use agri_control::{IntakeError, RegistryError};
use agri_core::error::AgriError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

/// JSON error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Machine-readable error code (e.g., "bad_request", "queue_full").
    pub error: String,
    /// Human-readable error message.
    pub message: String,
}

/// API error type that maps to HTTP status codes and JSON responses.
#[derive(Debug)]
pub enum ApiError {
    /// 400 Bad Request - malformed body or missing required fields.
    BadRequest(String),
    /// 422 Unprocessable Entity - well-formed request the engine refused.
    UnprocessableEntity(String),
    /// 500 Internal Server Error - unexpected server error.
    Internal(String),
    /// 503 Service Unavailable - intake full.
    QueueFull(String),
    /// 503 Service Unavailable - engine shutting down.
    ServiceUnavailable(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            ApiError::UnprocessableEntity(msg) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "unprocessable_entity", msg)
            }
            ApiError::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg)
            }
            ApiError::QueueFull(msg) => (StatusCode::SERVICE_UNAVAILABLE, "queue_full", msg),
            ApiError::ServiceUnavailable(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, "service_unavailable", msg)
            }
        };

        let body = ErrorBody {
            error: error_code.to_string(),
            message,
        };

        (status, Json(body)).into_response()
    }
}

impl From<IntakeError> for ApiError {
    fn from(err: IntakeError) -> Self {
        match err {
            IntakeError::QueueFull { .. } => ApiError::QueueFull(err.to_string()),
            IntakeError::Closed => ApiError::ServiceUnavailable(err.to_string()),
        }
    }
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        ApiError::UnprocessableEntity(err.to_string())
    }
}

impl From<AgriError> for ApiError {
    fn from(err: AgriError) -> Self {
        match &err {
            AgriError::InvalidTask(msg) => ApiError::BadRequest(msg.clone()),
            _ => ApiError::Internal(err.to_string()),
        }
    }
}
