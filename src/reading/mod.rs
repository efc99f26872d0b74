//! Sensor readings
//!
//! A [`Reading`] is the unit of data that flows through the hub. It is
//! created once by [`ingest`] and then shared, never mutated, between every
//! session it is delivered to.
//!
//! # Wire format
//!
//! ```json
//! {"deviceId":"NYC","temperature":30,"humidity":45,"timestamp":"2024-05-01T12:00:00.000Z"}
//! ```
//!
//! `timestamp` is always emitted as an RFC 3339 UTC string with millisecond
//! precision.

pub mod ingest;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

pub use ingest::{ingest, ingest_json};

/// A single sensor reading
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    /// Identifier of the reporting device (non-empty)
    pub device_id: String,
    /// Temperature in whole degrees
    pub temperature: i64,
    /// Relative humidity in whole percent
    pub humidity: i64,
    /// When the reading was taken, or when it was ingested if the device
    /// did not say
    #[serde(with = "rfc3339_millis")]
    pub timestamp: DateTime<Utc>,
}

impl Reading {
    /// Create a reading with an explicit timestamp
    pub fn new(
        device_id: impl Into<String>,
        temperature: i64,
        humidity: i64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            device_id: device_id.into(),
            temperature,
            humidity,
            timestamp,
        }
    }

    /// Create a reading stamped with the current time
    pub fn now(device_id: impl Into<String>, temperature: i64, humidity: i64) -> Self {
        Self::new(device_id, temperature, humidity, Utc::now())
    }

    /// Encode as the JSON event payload
    pub fn to_json_vec(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

mod rfc3339_millis {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|ts| ts.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

impl std::fmt::Display for Reading {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} t={} h={} @ {}",
            self.device_id,
            self.temperature,
            self.humidity,
            self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
        )
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_wire_format() {
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let reading = Reading::new("NYC", 30, 45, ts);

        let json: serde_json::Value =
            serde_json::from_slice(&reading.to_json_vec().unwrap()).unwrap();

        assert_eq!(json["deviceId"], "NYC");
        assert_eq!(json["temperature"], 30);
        assert_eq!(json["humidity"], 45);
        assert_eq!(json["timestamp"], "2024-05-01T12:00:00.000Z");
    }

    #[test]
    fn test_decode_event_payload() {
        let payload = br#"{"deviceId":"LON","temperature":-3,"humidity":80,"timestamp":"2024-05-01T12:00:00.250Z"}"#;
        let reading: Reading = serde_json::from_slice(payload).unwrap();

        assert_eq!(reading.device_id, "LON");
        assert_eq!(reading.temperature, -3);
        assert_eq!(reading.timestamp.timestamp_subsec_millis(), 250);
    }

    #[test]
    fn test_display() {
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let reading = Reading::new("TYO", 21, 60, ts);
        assert_eq!(reading.to_string(), "TYO t=21 h=60 @ 2024-05-01T12:00:00.000Z");
    }
}
