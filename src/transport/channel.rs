// src/transport/channel.rs - In-process transport over tokio channels
use super::{InboundMessage, MessageSink, MessageSource};
use crate::error::{RelayError, Result};
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Source fed by an mpsc sender; finishes when every sender is dropped
pub struct ChannelSource {
    rx: mpsc::Receiver<InboundMessage>,
}

impl ChannelSource {
    pub fn new(rx: mpsc::Receiver<InboundMessage>) -> Self {
        Self { rx }
    }

    /// Create a source together with the sender that feeds it
    pub fn pair(capacity: usize) -> (mpsc::Sender<InboundMessage>, Self) {
        let (tx, rx) = mpsc::channel(capacity);
        (tx, Self::new(rx))
    }
}

#[async_trait]
impl MessageSource for ChannelSource {
    async fn connect(&mut self) -> Result<()> {
        Ok(())
    }

    async fn recv(&mut self) -> Result<Option<InboundMessage>> {
        Ok(self.rx.recv().await)
    }

    fn describe(&self) -> String {
        "channel".to_string()
    }
}

/// Sink that hands payloads to an mpsc receiver
pub struct ChannelSink {
    tx: mpsc::Sender<Vec<u8>>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<Vec<u8>>) -> Self {
        Self { tx }
    }

    /// Create a sink together with the receiver that drains it
    pub fn pair(capacity: usize) -> (Self, mpsc::Receiver<Vec<u8>>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx), rx)
    }
}

#[async_trait]
impl MessageSink for ChannelSink {
    async fn send(&mut self, payload: &[u8]) -> Result<()> {
        self.tx
            .send(payload.to_vec())
            .await
            .map_err(|_| RelayError::Transport("channel sink receiver dropped".to_string()))
    }

    fn describe(&self) -> String {
        "channel".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_source_ends_when_senders_drop() {
        let (tx, mut source) = ChannelSource::pair(4);
        tx.send(InboundMessage::new("t", "a=1")).await.unwrap();
        drop(tx);

        assert_eq!(
            source.recv().await.unwrap(),
            Some(InboundMessage::new("t", "a=1"))
        );
        assert_eq!(source.recv().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_sink_reports_dropped_receiver() {
        let (mut sink, rx) = ChannelSink::pair(1);
        drop(rx);
        assert!(matches!(sink.send(b"x").await, Err(RelayError::Transport(_))));
    }
}
