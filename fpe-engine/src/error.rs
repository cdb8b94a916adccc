//! Error types reported by FPE engines.

use crate::traits::Direction;

/// Engine status codes that map onto a specific [`EngineError`] variant.
pub mod status {
    pub const INVALID_INPUT_LENGTH: i32 = 18;
    pub const BUFFER_TOO_SMALL: i32 = 22;
    pub const FPE_INPUT_LENGTH_ZERO: i32 = 76;
    pub const FPE_INPUT_LENGTH_TOO_SHORT: i32 = 77;
    pub const FPE_INPUT_LENGTH_TOO_LONG: i32 = 78;
    pub const INPUT_DOES_NOT_MATCH_FORMAT: i32 = 679;
    pub const CENTRALIZED_FORMAT_NOT_FOUND: i32 = 684;
    pub const INSUFFICIENT_BUFFER_SIZE: i32 = 1606;
}

/// Error types for engine operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// Engine returned a non-zero status
    #[error("engine status {code}: {details}")]
    Status { code: i32, details: String },

    /// Transformed output does not fit the caller's buffer
    #[error("output of {required} bytes exceeds {capacity}-byte buffer")]
    BufferTooSmall { required: usize, capacity: usize },

    /// Input violates the configured format's alphabet or shape
    #[error("input does not match format '{format}'")]
    FormatMismatch { format: String },

    /// Format descriptor not known to the engine
    #[error("unknown format '{0}'")]
    UnknownFormat(String),

    /// Input length rejected by the engine
    #[error("invalid input length: {0}")]
    InvalidLength(String),

    /// Argument rejected before reaching the engine
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Engine produced bytes that are not UTF-8
    #[error("engine output is not valid UTF-8")]
    InvalidUtf8,

    /// Transform used for the wrong operation
    #[error("transform cannot be used for {attempted}")]
    WrongDirection { attempted: Direction },

    /// Engine could not be reached or refused the call
    #[error("engine unavailable: {0}")]
    Unavailable(String),
}

impl EngineError {
    /// Classify a raw engine status.
    ///
    /// `capacity` is the size of the output buffer that was offered, used to
    /// report buffer failures. `format` names the configured format.
    pub fn from_status(code: i32, details: String, capacity: usize, format: &str) -> Self {
        match code {
            status::BUFFER_TOO_SMALL | status::INSUFFICIENT_BUFFER_SIZE => {
                EngineError::BufferTooSmall {
                    required: capacity + 1,
                    capacity,
                }
            }
            status::INPUT_DOES_NOT_MATCH_FORMAT => EngineError::FormatMismatch {
                format: format.to_string(),
            },
            status::CENTRALIZED_FORMAT_NOT_FOUND => EngineError::UnknownFormat(format.to_string()),
            status::INVALID_INPUT_LENGTH
            | status::FPE_INPUT_LENGTH_ZERO
            | status::FPE_INPUT_LENGTH_TOO_SHORT
            | status::FPE_INPUT_LENGTH_TOO_LONG => EngineError::InvalidLength(details),
            _ => EngineError::Status { code, details },
        }
    }
}
