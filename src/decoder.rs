// src/decoder.rs - Payload decoding and timestamp normalization
//
// Two wire shapes are accepted:
//
//   {"type": "heart_rate", "timestamp": 1700000000, "value": 75.5}
//   heartrate=72;timestamp=1700000000000000000;bed=7
//
// Both end up as a flat field map plus one timestamp in seconds since epoch.

use crate::{error::DecodeError, value::FieldValue};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// Values above this are nanoseconds
const NANOS_THRESHOLD: f64 = 1e18;
/// Values above this are microseconds
const MICROS_THRESHOLD: f64 = 1e15;
/// Values above this are milliseconds
const MILLIS_THRESHOLD: f64 = 1e12;

/// Naive datetime layouts accepted for text timestamps, interpreted as UTC
const DATETIME_PATTERNS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
];

/// One decoded message
///
/// The timestamp key is lifted out of the field map. A payload without any
/// timestamp key decodes to a sample with `timestamp() == None`; the relay
/// stamps such samples with their receive time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sample {
    timestamp: Option<f64>,
    fields: BTreeMap<String, FieldValue>,
}

impl Sample {
    pub fn new(timestamp: Option<f64>, fields: BTreeMap<String, FieldValue>) -> Self {
        Self { timestamp, fields }
    }

    /// Normalized timestamp in seconds since epoch
    pub fn timestamp(&self) -> Option<f64> {
        self.timestamp
    }

    /// Copy of this sample carrying `timestamp`
    pub fn with_timestamp(self, timestamp: f64) -> Self {
        Self {
            timestamp: Some(timestamp),
            fields: self.fields,
        }
    }

    pub fn fields(&self) -> &BTreeMap<String, FieldValue> {
        &self.fields
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Numeric fields only, in field-name order
    pub fn numeric_fields(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.fields
            .iter()
            .filter_map(|(name, value)| value.as_float().map(|v| (name.as_str(), v)))
    }

    /// The `type` discriminator, when the payload carries one as text
    pub fn vital_type(&self) -> Option<&str> {
        self.fields.get("type").and_then(FieldValue::as_text)
    }
}

/// Decode a raw payload
///
/// # Examples
///
/// ```rust
/// use vitals_relay::decoder::decode;
///
/// let sample = decode(br#"{"type":"heart_rate","timestamp":1700000000000,"value":75.5}"#)?;
/// assert_eq!(sample.timestamp(), Some(1_700_000_000.0));
/// assert_eq!(sample.get("value").and_then(|v| v.as_float()), Some(75.5));
///
/// let sample = decode(b"sys=120;dia=80;timestamp=1700000000")?;
/// assert_eq!(sample.numeric_fields().count(), 2);
/// # Ok::<(), vitals_relay::DecodeError>(())
/// ```
pub fn decode(raw: &[u8]) -> Result<Sample, DecodeError> {
    let text = std::str::from_utf8(raw).map_err(|e| DecodeError::Utf8(e.to_string()))?;
    decode_str(text)
}

/// Decode an already UTF-8 payload
pub fn decode_str(text: &str) -> Result<Sample, DecodeError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(DecodeError::Empty);
    }

    match serde_json::from_str::<serde_json::Value>(text) {
        Ok(serde_json::Value::Object(map)) => {
            let mut builder = SampleBuilder::default();
            for (key, value) in &map {
                builder.push(key, RawField::Json(value))?;
            }
            Ok(builder.build())
        }
        // Double-encoded string payloads carry the pair form inside
        Ok(serde_json::Value::String(inner)) => decode_pairs(&inner),
        _ => decode_pairs(text),
    }
}

/// Normalize an epoch timestamp of unknown unit to seconds
///
/// The unit is guessed from the magnitude: nanoseconds above 1e18,
/// microseconds above 1e15, milliseconds above 1e12, seconds otherwise.
pub fn normalize_timestamp(value: f64) -> f64 {
    if value > NANOS_THRESHOLD {
        value / 1e9
    } else if value > MICROS_THRESHOLD {
        value / 1e6
    } else if value > MILLIS_THRESHOLD {
        value / 1e3
    } else {
        value
    }
}

/// Parse a text timestamp: numeric epoch (any unit), RFC 3339, or one of the
/// naive `YYYY-MM-DD HH:MM:SS[.f]` layouts with a space or `T` separator
pub fn parse_timestamp(raw: &str) -> Result<f64, DecodeError> {
    let raw = raw.trim();

    if let Ok(n) = raw.parse::<f64>() {
        return numeric_timestamp(n, raw);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(epoch_seconds(&dt.with_timezone(&Utc)));
    }

    for pattern in DATETIME_PATTERNS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, pattern) {
            return Ok(epoch_seconds(&naive.and_utc()));
        }
    }

    Err(DecodeError::InvalidTimestamp(raw.to_string()))
}

fn numeric_timestamp(value: f64, raw: &str) -> Result<f64, DecodeError> {
    if value.is_finite() {
        Ok(normalize_timestamp(value))
    } else {
        Err(DecodeError::InvalidTimestamp(raw.to_string()))
    }
}

fn json_timestamp(value: &serde_json::Value) -> Result<f64, DecodeError> {
    match value {
        serde_json::Value::Number(n) => match n.as_f64() {
            Some(f) => numeric_timestamp(f, &n.to_string()),
            None => Err(DecodeError::InvalidTimestamp(n.to_string())),
        },
        serde_json::Value::String(s) => parse_timestamp(s),
        other => Err(DecodeError::InvalidTimestamp(other.to_string())),
    }
}

fn epoch_seconds(dt: &DateTime<Utc>) -> f64 {
    dt.timestamp() as f64 + f64::from(dt.timestamp_subsec_nanos()) / 1e9
}

fn is_timestamp_key(key: &str) -> bool {
    key.to_lowercase().contains("timestamp")
}

fn decode_pairs(text: &str) -> Result<Sample, DecodeError> {
    let mut builder = SampleBuilder::default();
    let mut segments = 0usize;

    for segment in text.split(';') {
        let segment = segment.trim();
        if segment.is_empty() {
            continue;
        }
        segments += 1;

        let (key, value) = segment
            .split_once('=')
            .ok_or_else(|| DecodeError::MissingSeparator(segment.to_string()))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(DecodeError::EmptyKey(segment.to_string()));
        }

        builder.push(key, RawField::Text(value.trim()))?;
    }

    if segments == 0 {
        return Err(DecodeError::Empty);
    }

    Ok(builder.build())
}

enum RawField<'a> {
    Text(&'a str),
    Json(&'a serde_json::Value),
}

#[derive(Default)]
struct SampleBuilder {
    timestamp: Option<f64>,
    fields: BTreeMap<String, FieldValue>,
}

impl SampleBuilder {
    fn push(&mut self, key: &str, raw: RawField<'_>) -> Result<(), DecodeError> {
        if is_timestamp_key(key) {
            // First timestamp key wins; later ones are dropped unparsed
            if self.timestamp.is_none() {
                self.timestamp = Some(match raw {
                    RawField::Text(s) => parse_timestamp(s)?,
                    RawField::Json(v) => json_timestamp(v)?,
                });
            }
            return Ok(());
        }

        let value = match raw {
            RawField::Text(s) => FieldValue::parse(s),
            RawField::Json(v) => FieldValue::from_json(v),
        };
        self.fields.insert(key.to_string(), value);
        Ok(())
    }

    fn build(self) -> Sample {
        Sample::new(self.timestamp, self.fields)
    }
}
