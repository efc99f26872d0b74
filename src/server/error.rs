//! HTTP error responses

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::error::{Error, ValidationError};
use crate::registry::RegistryError;

/// Error returned from an HTTP handler
#[derive(Debug)]
pub struct ApiError(pub Error);

impl ApiError {
    /// HTTP status for this error
    pub fn status_code(&self) -> StatusCode {
        match &self.0 {
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::Registry(_) => StatusCode::SERVICE_UNAVAILABLE,
            Error::Io(_) | Error::Encode(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Machine-readable error code
    pub fn code(&self) -> &'static str {
        match &self.0 {
            Error::Validation(_) => "validation",
            Error::Registry(_) => "unavailable",
            Error::Io(_) | Error::Encode(_) => "internal",
        }
    }

    fn message(&self) -> String {
        match &self.0 {
            // Drop the "Validation error:" prefix, the code already says it
            Error::Validation(e) => e.to_string(),
            Error::Registry(e) => e.to_string(),
            other => other.to_string(),
        }
    }
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        ApiError(e)
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        ApiError(Error::Validation(e))
    }
}

impl From<RegistryError> for ApiError {
    fn from(e: RegistryError) -> Self {
        ApiError(Error::Registry(e))
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code
    pub error: &'static str,
    /// Human-readable message
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: self.code(),
            message: self.message(),
        };

        if status.is_server_error() {
            tracing::warn!(error_code = body.error, error_message = %body.message, "Request failed");
        } else {
            tracing::debug!(error_code = body.error, error_message = %body.message, "Request rejected");
        }

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_is_bad_request() {
        let err = ApiError::from(ValidationError::MissingDeviceId);
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code(), "validation");
        assert!(err.message().contains("deviceId"));
    }

    #[test]
    fn test_session_limit_is_unavailable() {
        let err = ApiError::from(RegistryError::SessionLimit(4));
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
