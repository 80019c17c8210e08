//! Message transports
//!
//! A [`MessageSource`] yields raw inbound payloads; a [`MessageSink`] accepts
//! raw payloads to mirror downstream. The MQTT and HTTP implementations are
//! feature-gated; the channel transport is always available.

use crate::{
    config::{SinkConfig, SourceConfig},
    error::{RelayError, Result},
};
use async_trait::async_trait;

pub mod channel;

#[cfg(feature = "mqtt")]
pub mod mqtt;

#[cfg(feature = "http")]
pub mod http;

pub use channel::{ChannelSink, ChannelSource};

/// One raw message as delivered by a source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Topic or URL the payload came from
    pub origin: String,
    pub payload: Vec<u8>,
}

impl InboundMessage {
    pub fn new(origin: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            origin: origin.into(),
            payload: payload.into(),
        }
    }
}

/// Where inbound messages come from
#[async_trait]
pub trait MessageSource: Send {
    /// Connect and subscribe; failure here is fatal for the relay
    async fn connect(&mut self) -> Result<()>;

    /// Wait for the next message; `Ok(None)` means the source is finished
    async fn recv(&mut self) -> Result<Option<InboundMessage>>;

    fn describe(&self) -> String;
}

/// Where accepted raw payloads are mirrored to
#[async_trait]
pub trait MessageSink: Send {
    async fn connect(&mut self) -> Result<()> {
        Ok(())
    }

    async fn send(&mut self, payload: &[u8]) -> Result<()>;

    fn describe(&self) -> String;
}

/// Build the source named by the configuration
pub fn open_source(config: &SourceConfig) -> Result<Box<dyn MessageSource>> {
    match config {
        #[cfg(feature = "mqtt")]
        SourceConfig::Mqtt(endpoint) => Ok(Box::new(mqtt::MqttSource::new(endpoint.clone()))),
        #[cfg(not(feature = "mqtt"))]
        SourceConfig::Mqtt(_) => Err(disabled("mqtt")),

        #[cfg(feature = "http")]
        SourceConfig::Http(poll) => Ok(Box::new(http::HttpPollSource::new(poll.clone())?)),
        #[cfg(not(feature = "http"))]
        SourceConfig::Http(_) => Err(disabled("http")),
    }
}

/// Build the sink named by the configuration
pub fn open_sink(config: &SinkConfig) -> Result<Box<dyn MessageSink>> {
    match config {
        #[cfg(feature = "mqtt")]
        SinkConfig::Mqtt(endpoint) => Ok(Box::new(mqtt::MqttSink::new(endpoint.clone()))),
        #[cfg(not(feature = "mqtt"))]
        SinkConfig::Mqtt(_) => Err(disabled("mqtt")),

        #[cfg(feature = "http")]
        SinkConfig::Http(post) => Ok(Box::new(http::HttpSink::new(post.clone())?)),
        #[cfg(not(feature = "http"))]
        SinkConfig::Http(_) => Err(disabled("http")),
    }
}

#[allow(dead_code)]
fn disabled(feature: &str) -> RelayError {
    RelayError::Config(format!(
        "{} transport requires the '{}' feature",
        feature.to_uppercase(),
        feature
    ))
}
