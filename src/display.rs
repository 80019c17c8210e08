// src/display.rs - Display sinks for buffer snapshots
use crate::series::Snapshot;
use chrono::DateTime;
use std::io::Write;
use tracing::{info, warn};

/// Receives the buffer contents after every update
///
/// Rendering is synchronous; a slow renderer delays the next message.
#[cfg_attr(test, mockall::automock)]
pub trait Renderer: Send {
    fn render(&mut self, snapshot: &Snapshot);
}

/// Format an epoch timestamp as an `HH:MM:SS` (UTC) axis label
pub fn display_time(timestamp: f64) -> String {
    if !timestamp.is_finite() {
        return "--:--:--".to_string();
    }
    let secs = timestamp.floor();
    let nanos = ((timestamp - secs) * 1e9) as u32;
    match DateTime::from_timestamp(secs as i64, nanos.min(999_999_999)) {
        Some(dt) => dt.format("%H:%M:%S").to_string(),
        None => "--:--:--".to_string(),
    }
}

/// Logs the latest value of every series
#[derive(Debug, Default)]
pub struct LogRenderer;

impl Renderer for LogRenderer {
    fn render(&mut self, snapshot: &Snapshot) {
        for (field, points) in snapshot.iter() {
            match snapshot.latest(field) {
                Some((ts, value)) => info!(
                    "{:<12} {:>10.2} @ {} [{} pts]",
                    field,
                    value,
                    display_time(ts),
                    points.len()
                ),
                None => info!("{:<12} {:>10} [{} pts]", field, "-", points.len()),
            }
        }
    }
}

/// Writes each snapshot as one JSON line, for an external plotter to consume
///
/// Gap markers serialize as `null`.
pub struct JsonLinesRenderer<W: Write + Send> {
    writer: W,
}

impl<W: Write + Send> JsonLinesRenderer<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> Renderer for JsonLinesRenderer<W> {
    fn render(&mut self, snapshot: &Snapshot) {
        let result = serde_json::to_writer(&mut self.writer, snapshot)
            .map_err(std::io::Error::from)
            .and_then(|_| self.writer.write_all(b"\n"))
            .and_then(|_| self.writer.flush());
        if let Err(e) = result {
            warn!("Failed to write snapshot: {}", e);
        }
    }
}

/// Discards snapshots
#[derive(Debug, Default)]
pub struct NullRenderer;

impl Renderer for NullRenderer {
    fn render(&mut self, _snapshot: &Snapshot) {}
}
