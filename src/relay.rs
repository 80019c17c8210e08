// src/relay.rs - Relay/display driver
use crate::{
    config::Config,
    decoder::{self, Sample},
    display::{LogRenderer, NullRenderer, Renderer},
    error::Result,
    filter::ForwardFilter,
    series::{SeriesBuffer, Snapshot},
    transport::{open_sink, open_source, InboundMessage, MessageSink, MessageSource},
};
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Relay lifecycle; there is no way back to `Idle`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RelayState {
    /// Created, source not yet connected
    Idle,
    /// Source connected and subscribed
    Streaming,
}

/// Counters for everything the relay has seen
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RelayStats {
    pub received: u64,
    pub decoded: u64,
    pub decode_errors: u64,
    pub forwarded: u64,
    pub forward_errors: u64,
    pub filtered: u64,
    pub source_errors: u64,
    pub uptime_secs: u64,
}

/// Pulls messages from a source, buffers their numeric fields, mirrors
/// accepted raw payloads to a sink and renders after every update
///
/// Everything happens in order on the caller's task: a slow sink or renderer
/// directly delays the next receive. Forwarding is best effort: sink failures
/// are logged and never retried.
pub struct Relay {
    source: Box<dyn MessageSource>,
    sink: Option<Box<dyn MessageSink>>,
    renderer: Box<dyn Renderer>,
    buffer: SeriesBuffer,
    filter: ForwardFilter,
    forward_delay: Duration,
    state: RelayState,
    stats: RelayStats,
    start_time: Instant,
}

impl Relay {
    pub fn new(source: Box<dyn MessageSource>, buffer: SeriesBuffer) -> Self {
        Self {
            source,
            sink: None,
            renderer: Box::new(NullRenderer),
            buffer,
            filter: ForwardFilter::default(),
            forward_delay: Duration::ZERO,
            state: RelayState::Idle,
            stats: RelayStats::default(),
            start_time: Instant::now(),
        }
    }

    /// Build transports, buffer and a log renderer from configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;

        let buffer = SeriesBuffer::with_options(
            config.buffer.capacity,
            config.buffer.axis,
            config.buffer.exclude.iter().cloned(),
        )?;
        let source = open_source(&config.source)?;

        let mut relay = Self::new(source, buffer)
            .with_renderer(Box::new(LogRenderer))
            .with_filter(config.filter.clone())
            .with_forward_delay(Duration::from_millis(config.relay.forward_delay_ms));
        if let Some(sink) = &config.sink {
            relay = relay.with_sink(open_sink(sink)?);
        }
        Ok(relay)
    }

    pub fn with_sink(mut self, sink: Box<dyn MessageSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn with_renderer(mut self, renderer: Box<dyn Renderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn with_filter(mut self, filter: ForwardFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_forward_delay(mut self, delay: Duration) -> Self {
        self.forward_delay = delay;
        self
    }

    pub fn state(&self) -> RelayState {
        self.state
    }

    pub fn stats(&self) -> RelayStats {
        RelayStats {
            uptime_secs: self.start_time.elapsed().as_secs(),
            ..self.stats.clone()
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        self.buffer.snapshot()
    }

    pub fn buffer(&self) -> &SeriesBuffer {
        &self.buffer
    }

    /// Connect the sink (if any) and the source, then move to `Streaming`
    ///
    /// Any failure here is fatal; calling again once streaming is a no-op.
    pub async fn connect(&mut self) -> Result<()> {
        if self.state == RelayState::Streaming {
            return Ok(());
        }

        if let Some(sink) = self.sink.as_mut() {
            sink.connect().await?;
            info!("Forwarding to {}", sink.describe());
        }

        self.source.connect().await?;
        self.state = RelayState::Streaming;
        info!("Streaming from {}", self.source.describe());
        Ok(())
    }

    /// Consume messages until the source finishes
    ///
    /// Connects first when still idle. Receive errors are logged and the loop
    /// keeps going; only a failed initial connect is returned as an error.
    pub async fn run(&mut self) -> Result<()> {
        self.connect().await?;

        loop {
            match self.source.recv().await {
                Ok(Some(message)) => self.handle(message).await,
                Ok(None) => {
                    info!("Source {} finished", self.source.describe());
                    return Ok(());
                }
                Err(e) => {
                    self.stats.source_errors += 1;
                    warn!("Receive from {} failed: {}", self.source.describe(), e);
                }
            }
        }
    }

    /// Process one inbound message: decode, forward, buffer, render
    pub async fn handle(&mut self, message: InboundMessage) {
        self.stats.received += 1;

        let sample = match decoder::decode(&message.payload) {
            Ok(sample) => sample,
            Err(e) => {
                self.stats.decode_errors += 1;
                warn!("Discarding message from {}: {}", message.origin, e);
                return;
            }
        };
        self.stats.decoded += 1;
        debug!("Received from {}: {:?}", message.origin, sample);

        if self.filter.accepts(&sample) {
            self.forward(&message.payload).await;
        } else {
            self.stats.filtered += 1;
        }

        let sample = stamp(sample);
        self.buffer.append(&sample);
        self.renderer.render(&self.buffer.snapshot());
    }

    async fn forward(&mut self, payload: &[u8]) {
        let Some(sink) = self.sink.as_mut() else {
            return;
        };

        if !self.forward_delay.is_zero() {
            tokio::time::sleep(self.forward_delay).await;
        }

        match sink.send(payload).await {
            Ok(()) => {
                self.stats.forwarded += 1;
                debug!("Forwarded {} bytes to {}", payload.len(), sink.describe());
            }
            Err(e) => {
                self.stats.forward_errors += 1;
                warn!("Forward to {} failed: {}", sink.describe(), e);
            }
        }
    }
}

/// Give timestamp-less samples their receive time
fn stamp(sample: Sample) -> Sample {
    match sample.timestamp() {
        Some(_) => sample,
        None => sample.with_timestamp(now_secs()),
    }
}

fn now_secs() -> f64 {
    let now = chrono::Utc::now();
    now.timestamp() as f64 + f64::from(now.timestamp_subsec_nanos()) / 1e9
}

impl std::fmt::Debug for Relay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Relay")
            .field("source", &self.source.describe())
            .field("sink", &self.sink.as_ref().map(|s| s.describe()))
            .field("state", &self.state)
            .field("stats", &self.stats)
            .finish()
    }
}

impl std::fmt::Display for RelayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RelayState::Idle => write!(f, "idle"),
            RelayState::Streaming => write!(f, "streaming"),
        }
    }
}
