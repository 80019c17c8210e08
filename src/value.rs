// src/value.rs - Decoded field values
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single decoded field value
///
/// Payload fields are either numeric (plotted and buffered) or text
/// (metadata such as the `type` discriminator). Numbers are always finite;
/// `NaN` and infinities are kept as text so they never reach a series.
///
/// # Examples
///
/// ```rust
/// use vitals_relay::FieldValue;
///
/// assert_eq!(FieldValue::parse("72.5"), FieldValue::Number(72.5));
/// assert_eq!(FieldValue::parse("heart_rate").as_float(), None);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Finite floating-point value
    Number(f64),
    /// Anything that is not a finite number
    Text(String),
}

impl FieldValue {
    /// Parse a trimmed scalar, falling back to text
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        match raw.parse::<f64>() {
            Ok(f) if f.is_finite() => FieldValue::Number(f),
            _ => FieldValue::Text(raw.to_string()),
        }
    }

    /// Build from a JSON value
    ///
    /// Strings go through [`FieldValue::parse`], so quoted numbers such as
    /// `"75.5"` become numeric. Non-scalars keep their JSON rendering as text.
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Number(n) => match n.as_f64() {
                Some(f) if f.is_finite() => FieldValue::Number(f),
                _ => FieldValue::Text(n.to_string()),
            },
            serde_json::Value::String(s) => FieldValue::parse(s),
            other => FieldValue::Text(other.to_string()),
        }
    }

    /// Numeric view of the value
    pub fn as_float(&self) -> Option<f64> {
        match self {
            FieldValue::Number(f) => Some(*f),
            FieldValue::Text(_) => None,
        }
    }

    /// Text view of the value, `None` for numbers
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            FieldValue::Number(_) => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, FieldValue::Number(_))
    }

    /// Get the type name of this value
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldValue::Number(_) => "number",
            FieldValue::Text(_) => "text",
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Number(n) => write!(f, "{}", n),
            FieldValue::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        if value.is_finite() {
            FieldValue::Number(value)
        } else {
            FieldValue::Text(value.to_string())
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_scalars() {
        assert_eq!(FieldValue::parse("75.5"), FieldValue::Number(75.5));
        assert_eq!(FieldValue::parse("  120 "), FieldValue::Number(120.0));
        assert_eq!(FieldValue::parse("1e3"), FieldValue::Number(1000.0));
        assert_eq!(FieldValue::parse("bed-7"), FieldValue::Text("bed-7".to_string()));

        // Non-finite numbers never become numeric samples
        assert_eq!(FieldValue::parse("NaN"), FieldValue::Text("NaN".to_string()));
        assert_eq!(FieldValue::parse("inf").as_float(), None);
    }

    #[test]
    fn test_from_json() {
        assert_eq!(FieldValue::from_json(&json!(60)), FieldValue::Number(60.0));
        assert_eq!(
            FieldValue::from_json(&json!("heart_rate")),
            FieldValue::Text("heart_rate".to_string())
        );
        assert_eq!(FieldValue::from_json(&json!("75.5")), FieldValue::Number(75.5));
        assert_eq!(
            FieldValue::from_json(&json!("NaN")),
            FieldValue::Text("NaN".to_string())
        );
        assert_eq!(FieldValue::from_json(&json!(true)), FieldValue::Text("true".to_string()));
        assert_eq!(FieldValue::from_json(&json!(null)), FieldValue::Text("null".to_string()));
        assert_eq!(FieldValue::from_json(&json!([1, 2])), FieldValue::Text("[1,2]".to_string()));
    }

    #[test]
    fn test_value_type_names() {
        assert_eq!(FieldValue::Number(1.0).type_name(), "number");
        assert_eq!(FieldValue::from("x").type_name(), "text");
        assert!(FieldValue::from(2.0).is_numeric());
        assert!(!FieldValue::from(f64::NAN).is_numeric());
    }

    #[test]
    fn test_display() {
        assert_eq!(FieldValue::Number(72.25).to_string(), "72.25");
        assert_eq!(FieldValue::from("sys").to_string(), "sys");
    }
}
