// src/transport/mqtt.rs - MQTT source and sink
use super::{InboundMessage, MessageSink, MessageSource};
use crate::{
    config::{MqttEndpoint, MqttQos},
    error::{RelayError, Result},
};
use async_trait::async_trait;
use rumqttc::{AsyncClient, ConnectReturnCode, Event, EventLoop, MqttOptions, Packet, QoS};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Request queue depth between the client handle and its event loop
const CLIENT_CAPACITY: usize = 100;

/// Back-off after an event loop error before the next poll
const POLL_ERROR_DELAY: Duration = Duration::from_secs(1);

impl From<MqttQos> for QoS {
    fn from(qos: MqttQos) -> Self {
        match qos {
            MqttQos::AtMostOnce => QoS::AtMostOnce,
            MqttQos::AtLeastOnce => QoS::AtLeastOnce,
            MqttQos::ExactlyOnce => QoS::ExactlyOnce,
        }
    }
}

fn mqtt_options(endpoint: &MqttEndpoint, role: &str) -> MqttOptions {
    let client_id = endpoint.client_id.clone().unwrap_or_else(|| {
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        format!("vitals-relay-{}-{}", role, &suffix[..8])
    });

    let mut options = MqttOptions::new(client_id, endpoint.host.clone(), endpoint.port);
    options.set_keep_alive(Duration::from_secs(endpoint.keepalive_secs));
    options.set_clean_session(endpoint.clean_session);
    if let (Some(username), Some(password)) = (&endpoint.username, &endpoint.password) {
        options.set_credentials(username.clone(), password.clone());
    }
    options
}

/// Poll until the broker answers the CONNECT
async fn wait_for_connack(eventloop: &mut EventLoop, address: &str) -> Result<()> {
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                return if ack.code == ConnectReturnCode::Success {
                    Ok(())
                } else {
                    Err(RelayError::Transport(format!(
                        "broker {} refused connection: {:?}",
                        address, ack.code
                    )))
                };
            }
            Ok(_) => {}
            Err(e) => {
                return Err(RelayError::Transport(format!(
                    "failed to connect to {}: {}",
                    address, e
                )))
            }
        }
    }
}

/// Subscribes to one topic and yields every PUBLISH received on it
pub struct MqttSource {
    endpoint: MqttEndpoint,
    client: AsyncClient,
    eventloop: EventLoop,
}

impl MqttSource {
    pub fn new(endpoint: MqttEndpoint) -> Self {
        let (client, eventloop) =
            AsyncClient::new(mqtt_options(&endpoint, "src"), CLIENT_CAPACITY);
        Self {
            endpoint,
            client,
            eventloop,
        }
    }
}

#[async_trait]
impl MessageSource for MqttSource {
    async fn connect(&mut self) -> Result<()> {
        let address = self.endpoint.address();
        wait_for_connack(&mut self.eventloop, &address).await?;
        info!("Connected to source broker {}", address);

        self.client
            .subscribe(&self.endpoint.topic, self.endpoint.qos.into())
            .await
            .map_err(|e| RelayError::Transport(format!("subscribe failed: {}", e)))?;
        info!("Subscribed to topic {}", self.endpoint.topic);
        Ok(())
    }

    async fn recv(&mut self) -> Result<Option<InboundMessage>> {
        loop {
            match self.eventloop.poll().await {
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    return Ok(Some(InboundMessage {
                        origin: publish.topic.clone(),
                        payload: publish.payload.to_vec(),
                    }));
                }
                Ok(Event::Incoming(Packet::SubAck(_))) => {
                    debug!("Subscription to {} acknowledged", self.endpoint.topic);
                }
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    // Reconnected; a clean session has lost the subscription
                    info!("Reconnected to {}", self.endpoint.address());
                    if let Err(e) = self
                        .client
                        .try_subscribe(&self.endpoint.topic, self.endpoint.qos.into())
                    {
                        warn!("Resubscribe to {} failed: {}", self.endpoint.topic, e);
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("MQTT source error: {}", e);
                    sleep(POLL_ERROR_DELAY).await;
                    return Err(RelayError::Transport(e.to_string()));
                }
            }
        }
    }

    fn describe(&self) -> String {
        format!("mqtt://{}/{}", self.endpoint.address(), self.endpoint.topic)
    }
}

/// Publishes payloads verbatim on one topic
///
/// The client event loop is driven by a background task once connected.
pub struct MqttSink {
    endpoint: MqttEndpoint,
    client: AsyncClient,
    eventloop: Option<EventLoop>,
}

impl MqttSink {
    pub fn new(endpoint: MqttEndpoint) -> Self {
        let (client, eventloop) =
            AsyncClient::new(mqtt_options(&endpoint, "sink"), CLIENT_CAPACITY);
        Self {
            endpoint,
            client,
            eventloop: Some(eventloop),
        }
    }
}

#[async_trait]
impl MessageSink for MqttSink {
    async fn connect(&mut self) -> Result<()> {
        let Some(mut eventloop) = self.eventloop.take() else {
            return Ok(());
        };

        let address = self.endpoint.address();
        wait_for_connack(&mut eventloop, &address).await?;
        info!("Connected to target broker {}", address);

        tokio::spawn(async move {
            loop {
                if let Err(e) = eventloop.poll().await {
                    warn!("MQTT sink error on {}: {}", address, e);
                    sleep(POLL_ERROR_DELAY).await;
                }
            }
        });
        Ok(())
    }

    async fn send(&mut self, payload: &[u8]) -> Result<()> {
        self.client
            .publish(
                &self.endpoint.topic,
                self.endpoint.qos.into(),
                false,
                payload.to_vec(),
            )
            .await
            .map_err(|e| RelayError::Transport(format!("publish failed: {}", e)))
    }

    fn describe(&self) -> String {
        format!("mqtt://{}/{}", self.endpoint.address(), self.endpoint.topic)
    }
}
