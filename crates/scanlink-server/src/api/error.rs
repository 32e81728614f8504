//! API error types and response handling.
//!
//! This module provides a unified error type for all API handlers
//! with automatic conversion to appropriate HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Result type alias for API handlers.
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type.
///
/// Each variant maps to a specific HTTP status code and produces a
/// consistent JSON error response.
#[derive(Debug, Clone)]
pub enum ApiError {
    /// 400 Bad Request - Invalid input from client.
    BadRequest {
        /// Machine-readable error code.
        error_code: String,
        /// Human-readable error message.
        message: String,
    },

    /// 404 Not Found - Resource does not exist.
    NotFound {
        /// Machine-readable error code.
        error_code: String,
        /// Human-readable error message.
        message: String,
    },

    /// 502 Bad Gateway - The radio rejected a command.
    BadGateway {
        /// Machine-readable error code.
        error_code: String,
        /// Human-readable error message.
        message: String,
    },

    /// 503 Service Unavailable - The Bluetooth radio is off or absent.
    ServiceUnavailable {
        /// Machine-readable error code.
        error_code: String,
        /// Human-readable error message.
        message: String,
    },
}

/// Standard JSON error response body.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "error": "radio_unavailable",
    "message": "Bluetooth radio unavailable: Bluetooth adapter is powered off",
    "details": null
}))]
pub struct ErrorResponse {
    /// Machine-readable error code (e.g., "peripheral_not_found").
    #[schema(example = "radio_unavailable")]
    pub error: String,

    /// Human-readable error message.
    #[schema(example = "Bluetooth radio unavailable")]
    pub message: String,

    /// Optional additional details for debugging.
    #[schema(nullable)]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_response) = match self {
            Self::BadRequest { error_code, message } => (
                StatusCode::BAD_REQUEST,
                ErrorResponse {
                    error: error_code,
                    message,
                    details: None,
                },
            ),

            Self::NotFound { error_code, message } => (
                StatusCode::NOT_FOUND,
                ErrorResponse {
                    error: error_code,
                    message,
                    details: None,
                },
            ),

            Self::BadGateway { error_code, message } => (
                StatusCode::BAD_GATEWAY,
                ErrorResponse {
                    error: error_code,
                    message,
                    details: None,
                },
            ),

            Self::ServiceUnavailable { error_code, message } => (
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorResponse {
                    error: error_code,
                    message,
                    details: None,
                },
            ),
        };

        (status, Json(error_response)).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BadRequest { message, .. } => write!(f, "Bad Request: {message}"),
            Self::NotFound { message, .. } => write!(f, "Not Found: {message}"),
            Self::BadGateway { message, .. } => write!(f, "Bad Gateway: {message}"),
            Self::ServiceUnavailable { message, .. } => {
                write!(f, "Service Unavailable: {message}")
            }
        }
    }
}

impl std::error::Error for ApiError {}

/// Convert from scanlink_core errors.
impl From<scanlink_core::ScanlinkError> for ApiError {
    fn from(err: scanlink_core::ScanlinkError) -> Self {
        use scanlink_core::ScanlinkError;

        let error_code = err.error_code().to_ascii_lowercase();
        match &err {
            ScanlinkError::RadioUnavailable(_) => Self::ServiceUnavailable {
                error_code,
                message: err.to_string(),
            },
            ScanlinkError::ScanCommandFailed(_) => Self::BadGateway {
                error_code,
                message: err.to_string(),
            },
            ScanlinkError::PeripheralNotFound(_) => Self::NotFound {
                error_code,
                message: err.to_string(),
            },
        }
    }
}

impl From<scanlink_core::ScanError> for ApiError {
    fn from(err: scanlink_core::ScanError) -> Self {
        Self::from(scanlink_core::ScanlinkError::from(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scanlink_core::{ScanError, ScanlinkError};

    #[test]
    fn test_bad_request_error() {
        let err = ApiError::BadRequest {
            error_code: "test_error".to_string(),
            message: "Test message".to_string(),
        };
        assert!(err.to_string().contains("Bad Request"));
    }

    #[test]
    fn test_error_response_serialization() {
        let response = ErrorResponse {
            error: "test_error".to_string(),
            message: "Test message".to_string(),
            details: None,
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("test_error"));
    }

    #[test]
    fn test_scan_errors_map_to_status() {
        let unavailable = ApiError::from(ScanError::DriverUnavailable("off".into()));
        assert_eq!(
            unavailable.into_response().status(),
            StatusCode::SERVICE_UNAVAILABLE
        );

        let rejected = ApiError::from(ScanError::DriverCommandFailed("busy".into()));
        assert_eq!(rejected.into_response().status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_not_found_uses_lowercase_code() {
        let err = ApiError::from(ScanlinkError::PeripheralNotFound("AA:BB".into()));
        match err {
            ApiError::NotFound { error_code, .. } => {
                assert_eq!(error_code, "peripheral_not_found");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_status_matches_core_classification() {
        let errors = [
            ScanlinkError::RadioUnavailable("off".into()),
            ScanlinkError::ScanCommandFailed("busy".into()),
            ScanlinkError::PeripheralNotFound("AA:BB".into()),
        ];
        for err in errors {
            let expected = err.http_status_code();
            let status = ApiError::from(err).into_response().status();
            assert_eq!(status.as_u16(), expected);
        }
    }
}
