//! Reading ingest and validation
//!
//! Turns an untrusted JSON payload into a normalized [`Reading`]. Ingest has
//! no side effects; publishing the result is up to the caller.

use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Map, Value};

use super::Reading;
use crate::error::ValidationError;

const DEVICE_ID: &str = "deviceId";
const TEMPERATURE: &str = "temperature";
const HUMIDITY: &str = "humidity";
const TIMESTAMP: &str = "timestamp";

/// Parse and validate a raw request body
pub fn ingest_json(body: &[u8]) -> Result<Reading, ValidationError> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| ValidationError::MalformedPayload(e.to_string()))?;
    ingest(&value)
}

/// Validate a decoded payload
///
/// `temperature` and `humidity` accept JSON integers, floats with no
/// fractional part, and strings holding an integer. `timestamp` may be an
/// RFC 3339 string or epoch milliseconds; when absent it is set to now.
pub fn ingest(payload: &Value) -> Result<Reading, ValidationError> {
    let obj = payload.as_object().ok_or_else(|| {
        ValidationError::MalformedPayload(format!("expected object, got {}", kind(payload)))
    })?;

    let device_id = match obj.get(DEVICE_ID) {
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
        _ => return Err(ValidationError::MissingDeviceId),
    };

    let temperature = integer_field(obj, TEMPERATURE)?;
    let humidity = integer_field(obj, HUMIDITY)?;
    let timestamp = timestamp_field(obj)?;

    Ok(Reading {
        device_id,
        temperature,
        humidity,
        timestamp,
    })
}

fn integer_field(obj: &Map<String, Value>, field: &'static str) -> Result<i64, ValidationError> {
    match obj.get(field) {
        None | Some(Value::Null) => Err(ValidationError::MissingField(field)),
        Some(Value::Number(n)) => {
            if let Some(i) = n.as_i64() {
                return Ok(i);
            }
            match n.as_f64() {
                // i64::MAX as f64 rounds up to 2^63, so the upper bound is exclusive
                Some(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 => {
                    Ok(f as i64)
                }
                _ => Err(ValidationError::invalid(
                    field,
                    format!("{} is not representable as an integer", n),
                )),
            }
        }
        Some(Value::String(s)) => s.trim().parse::<i64>().map_err(|_| {
            ValidationError::invalid(field, format!("{:?} is not an integer", s))
        }),
        Some(other) => Err(ValidationError::invalid(
            field,
            format!("expected integer, got {}", kind(other)),
        )),
    }
}

fn timestamp_field(obj: &Map<String, Value>) -> Result<DateTime<Utc>, ValidationError> {
    match obj.get(TIMESTAMP) {
        None | Some(Value::Null) => Ok(Utc::now()),
        Some(Value::String(s)) => DateTime::parse_from_rfc3339(s.trim())
            .map(|ts| ts.with_timezone(&Utc))
            .map_err(|e| ValidationError::invalid(TIMESTAMP, e.to_string())),
        Some(Value::Number(n)) => n
            .as_i64()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
            .ok_or_else(|| {
                ValidationError::invalid(TIMESTAMP, format!("{} is not epoch milliseconds", n))
            }),
        Some(other) => Err(ValidationError::invalid(
            TIMESTAMP,
            format!("expected string or number, got {}", kind(other)),
        )),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
