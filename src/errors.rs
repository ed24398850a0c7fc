use thiserror::Error;

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, ScanGateError>;

/// Caller-side input problems: empty arrays, wrong shapes, unsupported enum values.
///
/// These are never caught internally. They signal a caller bug or corrupted
/// upstream data, not a low-quality scan.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("{0} is empty")]
    Empty(&'static str),

    #[error("shape mismatch: expected {expected} values for {width}x{height}, got {actual}")]
    ShapeMismatch {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    #[error("dimension mismatch: expected {expected:?}, got {got:?}")]
    DimensionMismatch { expected: (u32, u32), got: (u32, u32) },

    #[error("expected an RGB image with 3 channels, got {0}")]
    ChannelCount(usize),

    #[error("unsupported value: {0}")]
    Unsupported(String),
}

impl InputError {
    pub fn unsupported(value: impl Into<String>) -> Self {
        Self::Unsupported(value.into())
    }
}

/// Crate-level error
#[derive(Debug, Error)]
pub enum ScanGateError {
    #[error("invalid input: {0}")]
    Input(#[from] InputError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
