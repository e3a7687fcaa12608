/// Reading ingress: parse and normalize upstream measurement payloads

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer};
use thiserror::Error;

use crate::types::{DeviceTrend, Reading};

/// Measurement payload as delivered by the upstream API
#[derive(Debug, Clone, Deserialize)]
pub struct RawReading {
    #[serde(rename = "Timestamp")]
    pub timestamp: String,

    #[serde(rename = "Value")]
    pub value: f64,

    // The key must be present even when its value is null or empty
    #[serde(rename = "TrendArrow", deserialize_with = "nullable_string")]
    pub trend_arrow: Option<String>,
}

fn nullable_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer)
}

/// Why a payload was rejected at the ingress boundary
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("unparseable timestamp '{0}'")]
    InvalidTimestamp(String),

    #[error("malformed reading payload: {0}")]
    MalformedPayload(#[from] serde_json::Error),
}

/// Validate and normalize a wire reading into the canonical record.
///
/// Timestamps with an explicit offset (including a trailing "Z") are
/// resolved to UTC; a naive instant is assumed to already be UTC. Empty
/// or unknown trend hint codes are discarded while the reading is kept.
pub fn parse_reading(raw: &RawReading) -> Result<Reading, IngestError> {
    let timestamp = parse_timestamp(&raw.timestamp)?;

    let device_trend = raw
        .trend_arrow
        .as_deref()
        .filter(|code| !code.is_empty())
        .and_then(DeviceTrend::from_code);

    Ok(Reading {
        timestamp,
        value: raw.value,
        device_trend,
    })
}

/// Parse a loose JSON payload straight into a canonical reading
pub fn parse_json(payload: &serde_json::Value) -> Result<Reading, IngestError> {
    let raw: RawReading = serde_json::from_value(payload.clone())?;
    parse_reading(&raw)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, IngestError> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.with_timezone(&Utc));
    }

    // No offset at all: assume UTC
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }

    Err(IngestError::InvalidTimestamp(raw.to_string()))
}
