//! Error types for the beat analysis engine

use thiserror::Error;

/// Errors reported at the engine boundary
///
/// A rejected frame leaves every piece of engine state untouched, so the
/// caller can simply continue with the next valid frame.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Frequency frame contains no bins")]
    EmptyFrame,
    #[error("Non-finite magnitude at bin {index}")]
    NonFiniteMagnitude { index: usize },
    #[error("Negative magnitude at bin {index}")]
    NegativeMagnitude { index: usize },
    #[error("Magnitude {value} at bin {index} is out of range")]
    MagnitudeOutOfRange { index: usize, value: f32 },
    #[error("Frame sample rate {actual} Hz does not match engine sample rate {expected} Hz")]
    SampleRateMismatch { expected: u32, actual: u32 },
    #[error("Timestamp {current}s precedes previous timestamp {previous}s")]
    TimestampRegression { previous: f64, current: f64 },
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(f64),
}

/// Result type alias for engine operations
pub type Result<T, E = EngineError> = std::result::Result<T, E>;
