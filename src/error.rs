use thiserror::Error;

/// Reasons a raw payload could not be turned into a [`Sample`](crate::decoder::Sample).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    /// Payload bytes are not valid UTF-8
    #[error("Payload is not valid UTF-8: {0}")]
    Utf8(String),

    /// Payload is empty or whitespace only
    #[error("Payload is empty")]
    Empty,

    /// A `key=value` segment has no `=`
    #[error("Segment '{0}' has no '=' separator")]
    MissingSeparator(String),

    /// A `key=value` segment has an empty key
    #[error("Segment '{0}' has an empty key")]
    EmptyKey(String),

    /// Timestamp field present but not a number or a known datetime format
    #[error("Unparseable timestamp '{0}'")]
    InvalidTimestamp(String),
}

/// Application level error type used throughout the crate.
#[derive(Error, Debug)]
pub enum RelayError {
    /// Payload decoding failure
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Connect, subscribe, publish or HTTP request failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// Invalid or inconsistent configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O related failure
    #[error("Io error: {0}")]
    Io(#[from] std::io::Error),

    /// Error while parsing YAML configuration files
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization failure
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenient alias over [`Result`] using [`RelayError`]
pub type Result<T> = std::result::Result<T, RelayError>;
