// src/config.rs - Relay configuration

use crate::{
    error::{RelayError, Result},
    filter::ForwardFilter,
    series::{AxisMode, DEFAULT_CAPACITY},
};
use serde::{Deserialize, Serialize};
use std::path::Path;

// ============================================================================
// MAIN CONFIGURATION
// ============================================================================

/// Main relay configuration
///
/// ```yaml
/// source:
///   kind: mqtt
///   host: sensorweb.us
///   topic: /unknown_org/74:4d:bd:89:2d:f4/vital
/// sink:
///   kind: mqtt
///   host: 127.0.0.1
///   topic: /unknown_org/74:4d:bd:89:2d:f4/vital
/// buffer:
///   capacity: 20
///   axis: per_field
/// filter:
///   required_field: heartrate
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Where messages are consumed from
    #[serde(default)]
    pub source: SourceConfig,

    /// Where accepted raw payloads are mirrored to (none = display only)
    #[serde(default)]
    pub sink: Option<SinkConfig>,

    /// Sample window configuration
    #[serde(default)]
    pub buffer: BufferConfig,

    /// Forwarding filter
    #[serde(default)]
    pub filter: ForwardFilter,

    /// Relay loop tuning
    #[serde(default)]
    pub relay: RelayConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source: SourceConfig::default(),
            sink: None,
            buffer: BufferConfig::default(),
            filter: ForwardFilter::default(),
            relay: RelayConfig::default(),
        }
    }
}

impl Config {
    /// Load and validate a YAML configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            RelayError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&text)
    }

    /// Parse and validate YAML configuration text
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        match &self.source {
            SourceConfig::Mqtt(endpoint) => endpoint.validate("source")?,
            SourceConfig::Http(poll) => {
                validate_url(&poll.url, "source")?;
                if poll.poll_interval_ms == 0 {
                    return Err(RelayError::Config(
                        "source poll_interval_ms must be greater than 0".to_string(),
                    ));
                }
            }
        }

        match &self.sink {
            Some(SinkConfig::Mqtt(endpoint)) => endpoint.validate("sink")?,
            Some(SinkConfig::Http(post)) => validate_url(&post.url, "sink")?,
            None => {}
        }

        if self.buffer.capacity == 0 {
            return Err(RelayError::Config(
                "buffer capacity must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

// ============================================================================
// TRANSPORT CONFIGURATION
// ============================================================================

/// Inbound transport
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SourceConfig {
    Mqtt(MqttEndpoint),
    Http(HttpPollConfig),
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig::Mqtt(MqttEndpoint::default())
    }
}

/// Outbound transport
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SinkConfig {
    Mqtt(MqttEndpoint),
    Http(HttpPostConfig),
}

/// One MQTT broker plus the topic used on it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MqttEndpoint {
    /// Broker host
    #[serde(default = "default_mqtt_host")]
    pub host: String,

    /// Broker port
    #[serde(default = "default_mqtt_port")]
    pub port: u16,

    /// Topic to subscribe to (source) or publish on (sink)
    #[serde(default = "default_mqtt_topic")]
    pub topic: String,

    /// Client ID; a unique one is generated when absent
    #[serde(default)]
    pub client_id: Option<String>,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    /// Keep alive in seconds
    #[serde(default = "default_mqtt_keepalive")]
    pub keepalive_secs: u64,

    /// Clean session
    #[serde(default = "default_true")]
    pub clean_session: bool,

    /// QoS level
    #[serde(default)]
    pub qos: MqttQos,
}

impl Default for MqttEndpoint {
    fn default() -> Self {
        Self {
            host: default_mqtt_host(),
            port: default_mqtt_port(),
            topic: default_mqtt_topic(),
            client_id: None,
            username: None,
            password: None,
            keepalive_secs: default_mqtt_keepalive(),
            clean_session: default_true(),
            qos: MqttQos::default(),
        }
    }
}

impl MqttEndpoint {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    fn validate(&self, role: &str) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(RelayError::Config(format!("{} MQTT host is empty", role)));
        }
        if self.topic.trim().is_empty() {
            return Err(RelayError::Config(format!("{} MQTT topic is empty", role)));
        }
        if self.keepalive_secs != 0 && self.keepalive_secs < 5 {
            return Err(RelayError::Config(format!(
                "{} MQTT keepalive_secs must be 0 or at least 5, got {}",
                role, self.keepalive_secs
            )));
        }
        if self.username.is_some() != self.password.is_some() {
            return Err(RelayError::Config(format!(
                "{} MQTT username and password must be set together",
                role
            )));
        }
        Ok(())
    }
}

/// MQTT QoS levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MqttQos {
    AtMostOnce,
    #[default]
    AtLeastOnce,
    ExactlyOnce,
}

/// HTTP polling source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpPollConfig {
    /// Fetch endpoint, queried with POST
    pub url: String,

    /// JSON body sent with every poll, e.g. `{"type": "heart_rate"}`
    #[serde(default = "default_http_query")]
    pub query: serde_json::Value,

    /// Delay between polls in milliseconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Per-request timeout in seconds
    #[serde(default = "default_http_timeout")]
    pub timeout_secs: u64,
}

/// HTTP POST sink
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpPostConfig {
    /// Ingest endpoint receiving the raw payload
    pub url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_http_timeout")]
    pub timeout_secs: u64,
}

// ============================================================================
// BUFFER AND RELAY CONFIGURATION
// ============================================================================

/// Sample window configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BufferConfig {
    /// Points kept per series
    #[serde(default = "default_capacity")]
    pub capacity: usize,

    /// Time axis discipline
    #[serde(default)]
    pub axis: AxisMode,

    /// Numeric fields never buffered
    #[serde(default = "default_excluded")]
    pub exclude: Vec<String>,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            axis: AxisMode::default(),
            exclude: default_excluded(),
        }
    }
}

/// Relay loop tuning
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Delay before each forward, in milliseconds
    #[serde(default)]
    pub forward_delay_ms: u64,
}

// ============================================================================
// DEFAULT VALUE FUNCTIONS
// ============================================================================

fn default_true() -> bool { true }
fn default_mqtt_host() -> String { "localhost".to_string() }
fn default_mqtt_port() -> u16 { 1883 }
fn default_mqtt_topic() -> String { "sensor/data".to_string() }
fn default_mqtt_keepalive() -> u64 { 60 }
fn default_http_query() -> serde_json::Value { serde_json::json!({}) }
fn default_poll_interval() -> u64 { 2000 }
fn default_http_timeout() -> u64 { 30 }
fn default_capacity() -> usize { DEFAULT_CAPACITY }
fn default_excluded() -> Vec<String> { vec!["type".to_string()] }

fn validate_url(url: &str, role: &str) -> Result<()> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(RelayError::Config(format!(
            "{} URL must start with http:// or https://, got '{}'",
            role, url
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::from_yaml("{}").unwrap();
        assert_eq!(config.buffer.capacity, 20);
        assert_eq!(config.buffer.axis, AxisMode::PerField);
        assert_eq!(config.buffer.exclude, vec!["type".to_string()]);
        assert!(config.sink.is_none());
        match config.source {
            SourceConfig::Mqtt(endpoint) => {
                assert_eq!(endpoint.address(), "localhost:1883");
                assert_eq!(endpoint.topic, "sensor/data");
                assert_eq!(endpoint.qos, MqttQos::AtLeastOnce);
            }
            other => panic!("unexpected source {:?}", other),
        }
    }

    #[test]
    fn test_http_source_and_sink() {
        let yaml = r#"
source:
  kind: http
  url: http://127.0.0.1:5100/fetch-medical
  query:
    type: heart_rate
  poll_interval_ms: 500
sink:
  kind: http
  url: http://127.0.0.1:5100/add-medical
buffer:
  capacity: 10
  axis: shared
"#;
        let config = Config::from_yaml(yaml).unwrap();
        match &config.source {
            SourceConfig::Http(poll) => {
                assert_eq!(poll.query["type"], "heart_rate");
                assert_eq!(poll.poll_interval_ms, 500);
                assert_eq!(poll.timeout_secs, 30);
            }
            other => panic!("unexpected source {:?}", other),
        }
        assert!(matches!(config.sink, Some(SinkConfig::Http(_))));
        assert_eq!(config.buffer.axis, AxisMode::Shared);
    }

    #[test]
    fn test_validation_errors() {
        let cases = [
            "buffer:\n  capacity: 0\n",
            "source:\n  kind: mqtt\n  topic: ''\n",
            "source:\n  kind: mqtt\n  keepalive_secs: 2\n",
            "source:\n  kind: mqtt\n  username: nurse\n",
            "source:\n  kind: http\n  url: ftp://x\n",
            "source:\n  kind: http\n  url: http://x\n  poll_interval_ms: 0\n",
            "sink:\n  kind: http\n  url: localhost\n",
        ];
        for yaml in cases {
            assert!(
                matches!(Config::from_yaml(yaml), Err(RelayError::Config(_))),
                "expected config error for {:?}",
                yaml
            );
        }
    }

    #[test]
    fn test_unknown_kind_is_yaml_error() {
        assert!(matches!(
            Config::from_yaml("source:\n  kind: carrier_pigeon\n"),
            Err(RelayError::Yaml(_))
        ));
    }
}
