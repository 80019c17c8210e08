//! Vitals Relay - decode, buffer, relay and display vital-sign telemetry
//!
//! Bed-side sensors publish heart rate, blood pressure and similar readings
//! in a handful of loosely defined payload shapes: JSON objects, JSON strings
//! wrapping `key=value;...` pairs, or the bare pair format. This crate turns
//! each payload into a [`Sample`], keeps the most recent points per numeric
//! field in a bounded [`SeriesBuffer`], optionally mirrors the raw payload to
//! a second broker or HTTP endpoint, and hands a [`Snapshot`] to a
//! [`Renderer`] after every update.
//!
//! # Feature Flags
//!
//! - `mqtt` (default): MQTT source and sink via `rumqttc`
//! - `http` (default): HTTP poll source and POST sink via `reqwest`
//!
//! # Examples
//!
//! ```rust
//! use vitals_relay::{decoder::decode, SeriesBuffer};
//!
//! let sample = decode(br#"{"type":"heart_rate","timestamp":1700000000,"value":75.5}"#)?;
//!
//! let mut buffer = SeriesBuffer::new(20)?;
//! buffer.append(&sample);
//!
//! let snapshot = buffer.snapshot();
//! assert_eq!(snapshot.get("value"), Some(&[(1700000000.0, 75.5)][..]));
//! # Ok::<(), vitals_relay::RelayError>(())
//! ```

// ============================================================================
// CORE MODULES
// ============================================================================

/// Error types for decoding and relay operation
pub mod error;

/// Field values carried by decoded samples
pub mod value;

/// Payload decoding and timestamp normalization
pub mod decoder;

/// Bounded per-field time series
pub mod series;

/// Forwarding predicate
pub mod filter;

/// Snapshot renderers
pub mod display;

/// YAML configuration with validation
pub mod config;

// ============================================================================
// RUNTIME MODULES
// ============================================================================

/// Message sources and sinks
pub mod transport;

/// Receive, decode, forward, buffer, render
pub mod relay;

/// Synthetic vital-sign payloads for testing and demos
pub mod generator;

// ============================================================================
// PUBLIC RE-EXPORTS
// ============================================================================

pub use config::Config;
pub use decoder::Sample;
pub use display::{JsonLinesRenderer, LogRenderer, NullRenderer, Renderer};
pub use error::{DecodeError, RelayError, Result};
pub use filter::ForwardFilter;
pub use generator::{GeneratorConfig, PublishStats, VitalGenerator, VitalKind};
pub use relay::{Relay, RelayState, RelayStats};
pub use series::{AxisMode, SeriesBuffer, Snapshot};
pub use transport::{InboundMessage, MessageSink, MessageSource};
pub use value::FieldValue;

// ============================================================================
// VERSION INFORMATION
// ============================================================================

/// Crate version string
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
