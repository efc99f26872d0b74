//! Error types
//!
//! Ingest errors are returned to the caller that submitted the reading.
//! [`TransportError`] never reaches [`Error`]: it stays inside the delivery
//! worker of the session it happened on.

use std::fmt;
use std::io;

use crate::registry::RegistryError;

/// Result type used across the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type
#[derive(Debug)]
pub enum Error {
    /// I/O error (socket bind, accept)
    Io(io::Error),
    /// Inbound reading failed validation
    Validation(ValidationError),
    /// Session registry refused an operation
    Registry(RegistryError),
    /// Reading could not be encoded for delivery
    Encode(serde_json::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Validation(e) => write!(f, "Validation error: {}", e),
            Error::Registry(e) => write!(f, "Registry error: {}", e),
            Error::Encode(e) => write!(f, "Encode error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Validation(e) => Some(e),
            Error::Registry(e) => Some(e),
            Error::Encode(e) => Some(e),
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<ValidationError> for Error {
    fn from(e: ValidationError) -> Self {
        Error::Validation(e)
    }
}

impl From<RegistryError> for Error {
    fn from(e: RegistryError) -> Self {
        Error::Registry(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Encode(e)
    }
}

/// Rejection of an inbound reading
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Body is not a JSON object
    MalformedPayload(String),
    /// `deviceId` missing, not a string, or blank
    MissingDeviceId,
    /// A required numeric field is absent
    MissingField(&'static str),
    /// A field is present but cannot be represented as required
    InvalidField {
        /// Wire name of the field
        field: &'static str,
        /// What was wrong with it
        reason: String,
    },
}

impl ValidationError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ValidationError::InvalidField {
            field,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::MalformedPayload(msg) => write!(f, "malformed payload: {}", msg),
            ValidationError::MissingDeviceId => write!(f, "deviceId is missing or empty"),
            ValidationError::MissingField(field) => write!(f, "{} is missing", field),
            ValidationError::InvalidField { field, reason } => {
                write!(f, "{} is invalid: {}", field, reason)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Failure writing to a subscriber's transport
#[derive(Debug)]
pub enum TransportError {
    /// Peer is gone; the write can never succeed
    Closed,
    /// Write did not complete within the configured timeout
    Timeout,
    /// Underlying socket error
    Io(io::Error),
}

impl TransportError {
    /// Whether the peer has gone away for good
    pub fn is_closed(&self) -> bool {
        matches!(self, TransportError::Closed)
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Closed => write!(f, "transport closed"),
            TransportError::Timeout => write!(f, "transport write timed out"),
            TransportError::Io(e) => write!(f, "transport I/O error: {}", e),
        }
    }
}

impl std::error::Error for TransportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TransportError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for TransportError {
    fn from(e: io::Error) -> Self {
        TransportError::Io(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_display() {
        let err = ValidationError::invalid("temperature", "not an integer");
        assert_eq!(err.to_string(), "temperature is invalid: not an integer");
        assert_eq!(
            ValidationError::MissingDeviceId.to_string(),
            "deviceId is missing or empty"
        );
    }

    #[test]
    fn test_error_conversions() {
        let err: Error = ValidationError::MissingField("humidity").into();
        assert!(matches!(err, Error::Validation(_)));
        assert!(std::error::Error::source(&err).is_some());

        let err: Error = io::Error::new(io::ErrorKind::AddrInUse, "busy").into();
        assert!(err.to_string().starts_with("I/O error"));
    }

    #[test]
    fn test_transport_is_closed() {
        assert!(TransportError::Closed.is_closed());
        assert!(!TransportError::Timeout.is_closed());
        let io_err: TransportError =
            io::Error::new(io::ErrorKind::BrokenPipe, "pipe").into();
        assert!(!io_err.is_closed());
    }
}
