// src/transport/http.rs - HTTP poll source and POST sink
use super::{InboundMessage, MessageSink, MessageSource};
use crate::{
    config::{HttpPollConfig, HttpPostConfig},
    decoder,
    error::{RelayError, Result},
};
use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Client};
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info};

/// Untimestamped entries remembered for de-duplication across polls
const UNTIMED_HISTORY: usize = 256;

fn build_client(timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| RelayError::Config(format!("Failed to create HTTP client: {}", e)))
}

fn transport_error(e: reqwest::Error) -> RelayError {
    RelayError::Transport(e.to_string())
}

/// Pull the entry objects out of a fetch response body
///
/// The body may be a JSON array of objects, a single object, or a JSON string
/// that itself contains one of those (double-encoded). Non-object array items
/// are skipped.
pub fn extract_entries(body: &str) -> Result<Vec<serde_json::Value>> {
    let mut value: serde_json::Value = serde_json::from_str(body)?;
    if let serde_json::Value::String(inner) = &value {
        value = serde_json::from_str(inner)?;
    }

    Ok(match value {
        serde_json::Value::Array(items) => items.into_iter().filter(|v| v.is_object()).collect(),
        obj @ serde_json::Value::Object(_) => vec![obj],
        _ => Vec::new(),
    })
}

/// Polls a fetch endpoint and yields one message per returned entry
///
/// Fetch endpoints return their whole recent history on every call, so
/// entries whose timestamp is not newer than the newest one already yielded
/// are skipped. Entries without a readable timestamp are yielded once; the
/// most recent of them are remembered by their serialized form.
pub struct HttpPollSource {
    client: Client,
    config: HttpPollConfig,
    pending: VecDeque<InboundMessage>,
    high_water: Option<f64>,
    untimed: VecDeque<Vec<u8>>,
    polled: bool,
}

impl HttpPollSource {
    pub fn new(config: HttpPollConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(config.timeout_secs)?,
            config,
            pending: VecDeque::new(),
            high_water: None,
            untimed: VecDeque::new(),
            polled: false,
        })
    }

    async fn poll_once(&mut self) -> Result<usize> {
        let response = self
            .client
            .post(&self.config.url)
            .json(&self.config.query)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(RelayError::Transport(format!(
                "{} returned {}",
                self.config.url, status
            )));
        }

        let body = response.text().await.map_err(transport_error)?;
        let entries = extract_entries(&body)?;
        self.enqueue(entries)
    }

    fn enqueue(&mut self, entries: Vec<serde_json::Value>) -> Result<usize> {
        let previous = self.high_water;
        let mut queued = 0;

        for entry in entries {
            let payload = serde_json::to_vec(&entry)?;
            let timestamp = decoder::decode(&payload).ok().and_then(|s| s.timestamp());

            match (timestamp, previous) {
                (Some(ts), Some(seen)) if ts <= seen => continue,
                (Some(ts), _) => {
                    self.high_water = Some(self.high_water.map_or(ts, |hw| hw.max(ts)));
                }
                (None, _) => {
                    if self.untimed.contains(&payload) {
                        continue;
                    }
                    if self.untimed.len() == UNTIMED_HISTORY {
                        self.untimed.pop_front();
                    }
                    self.untimed.push_back(payload.clone());
                }
            }

            self.pending
                .push_back(InboundMessage::new(self.config.url.clone(), payload));
            queued += 1;
        }

        Ok(queued)
    }
}

#[async_trait]
impl MessageSource for HttpPollSource {
    async fn connect(&mut self) -> Result<()> {
        info!(
            "Polling {} every {} ms",
            self.config.url, self.config.poll_interval_ms
        );
        Ok(())
    }

    async fn recv(&mut self) -> Result<Option<InboundMessage>> {
        loop {
            if let Some(message) = self.pending.pop_front() {
                return Ok(Some(message));
            }

            if self.polled {
                sleep(Duration::from_millis(self.config.poll_interval_ms)).await;
            }
            self.polled = true;

            let queued = self.poll_once().await?;
            debug!("Fetched {} new entries from {}", queued, self.config.url);
        }
    }

    fn describe(&self) -> String {
        self.config.url.clone()
    }
}

/// POSTs payloads verbatim as JSON
pub struct HttpSink {
    client: Client,
    config: HttpPostConfig,
}

impl HttpSink {
    pub fn new(config: HttpPostConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(config.timeout_secs)?,
            config,
        })
    }
}

#[async_trait]
impl MessageSink for HttpSink {
    async fn send(&mut self, payload: &[u8]) -> Result<()> {
        let response = self
            .client
            .post(&self.config.url)
            .header(CONTENT_TYPE, "application/json")
            .body(payload.to_vec())
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(RelayError::Transport(format!(
                "{} returned {}",
                self.config.url, status
            )))
        }
    }

    fn describe(&self) -> String {
        self.config.url.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn source() -> HttpPollSource {
        HttpPollSource::new(HttpPollConfig {
            url: "http://127.0.0.1:5100/fetch-medical".to_string(),
            query: json!({"type": "heart_rate"}),
            poll_interval_ms: 2000,
            timeout_secs: 5,
        })
        .unwrap()
    }

    #[test]
    fn test_extract_double_encoded_list() {
        let inner = r#"[{"timestamp": 1700000000, "value": 71.2}, 5, {"timestamp": 1700000002, "value": 72.0}]"#;
        let body = serde_json::to_string(inner).unwrap();

        let entries = extract_entries(&body).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1]["value"], json!(72.0));
    }

    #[test]
    fn test_extract_plain_shapes() {
        assert_eq!(extract_entries(r#"[{"a":1}]"#).unwrap().len(), 1);
        assert_eq!(extract_entries(r#"{"a":1}"#).unwrap().len(), 1);
        assert!(extract_entries("7").unwrap().is_empty());
        assert!(matches!(extract_entries("<html>"), Err(RelayError::Json(_))));
    }

    #[tokio::test]
    async fn test_high_water_mark_skips_repeats() {
        let mut source = source();
        let first = vec![
            json!({"timestamp": 1700000001, "value": 70}),
            json!({"timestamp": 1700000000, "value": 69}),
        ];
        assert_eq!(source.enqueue(first).unwrap(), 2);

        let second = vec![
            json!({"timestamp": 1700000000, "value": 69}),
            json!({"timestamp": 1700000001, "value": 70}),
            json!({"timestamp": 1700000002, "value": 71}),
            json!({"value": 72}),
        ];
        assert_eq!(source.enqueue(second.clone()).unwrap(), 2);
        assert_eq!(source.enqueue(second).unwrap(), 0);

        let mut values = Vec::new();
        while let Some(message) = source.pending.pop_front() {
            let sample = decoder::decode(&message.payload).unwrap();
            values.push(sample.get("value").and_then(|v| v.as_float()).unwrap());
        }
        assert_eq!(values, vec![70.0, 69.0, 71.0, 72.0]);
    }

    #[tokio::test]
    async fn test_untimestamped_entries_yielded_once() {
        let mut source = source();
        let history = vec![
            json!({"value": 72}),
            json!({"timestamp": 1700000000, "value": 70}),
        ];

        assert_eq!(source.enqueue(history.clone()).unwrap(), 2);
        assert_eq!(source.enqueue(history.clone()).unwrap(), 0);
        assert_eq!(source.enqueue(history).unwrap(), 0);

        let fresh = vec![json!({"value": 73}), json!({"value": 72})];
        assert_eq!(source.enqueue(fresh).unwrap(), 1);
        assert_eq!(source.pending.len(), 3);
    }

    #[tokio::test]
    async fn test_untimed_history_is_bounded() {
        let mut source = source();
        let entries: Vec<_> = (0..UNTIMED_HISTORY + 10).map(|i| json!({"seq": i})).collect();

        assert_eq!(source.enqueue(entries).unwrap(), UNTIMED_HISTORY + 10);
        assert_eq!(source.untimed.len(), UNTIMED_HISTORY);
        // The oldest entry has been forgotten
        assert_eq!(source.enqueue(vec![json!({"seq": 0})]).unwrap(), 1);
    }
}
