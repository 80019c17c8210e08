// src/filter.rs - Forwarding filter
use crate::decoder::Sample;
use serde::{Deserialize, Serialize};

/// Decides which decoded samples get their raw payload forwarded
///
/// An empty filter forwards everything. `required_field` separates vitals
/// messages (e.g. those carrying `heartrate`) from other device chatter;
/// `required_type` matches the textual `type` discriminator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForwardFilter {
    #[serde(default)]
    pub required_field: Option<String>,

    #[serde(default)]
    pub required_type: Option<String>,
}

impl ForwardFilter {
    pub fn requiring_field(field: impl Into<String>) -> Self {
        Self {
            required_field: Some(field.into()),
            required_type: None,
        }
    }

    pub fn accepts(&self, sample: &Sample) -> bool {
        if let Some(field) = &self.required_field {
            if !sample.contains(field) {
                return false;
            }
        }
        if let Some(kind) = &self.required_type {
            if sample.vital_type() != Some(kind.as_str()) {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::decode_str;

    #[test]
    fn test_empty_filter_accepts_all() {
        let sample = decode_str("x=1").unwrap();
        assert!(ForwardFilter::default().accepts(&sample));
    }

    #[test]
    fn test_required_field() {
        let filter = ForwardFilter::requiring_field("heartrate");
        assert!(filter.accepts(&decode_str("heartrate=70;timestamp=1").unwrap()));
        assert!(!filter.accepts(&decode_str("battery=93;timestamp=1").unwrap()));
    }

    #[test]
    fn test_required_type() {
        let filter = ForwardFilter {
            required_field: None,
            required_type: Some("heart_rate".to_string()),
        };
        assert!(filter.accepts(&decode_str(r#"{"type":"heart_rate","value":70}"#).unwrap()));
        assert!(!filter.accepts(&decode_str(r#"{"type":"blood_pressure","sys":120}"#).unwrap()));
        assert!(!filter.accepts(&decode_str("value=70").unwrap()));
    }
}
