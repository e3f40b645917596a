use thiserror::Error;

/// Failure taxonomy of the acquisition pipeline.
///
/// None of these are retried. Configuration errors surface before any worker
/// starts; read errors end the acquisition worker; sink errors end the
/// persistence worker.
#[derive(Debug, Error)]
pub enum DaqError {
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Hardware read failed: {0}")]
    HardwareRead(String),

    #[error("Malformed sample block: {0}")]
    MalformedBlock(String),

    #[error("Sink write failed: {0}")]
    Sink(#[from] std::io::Error),

    #[error("Sink header mismatch: expected '{expected}', found '{found}'")]
    HeaderMismatch { expected: String, found: String },

    #[error("Sample channel closed")]
    ChannelClosed,

    #[error("Cannot {action} in state {state}")]
    InvalidState { action: &'static str, state: String },
}

impl DaqError {
    pub fn config(msg: impl Into<String>) -> Self {
        DaqError::Configuration(msg.into())
    }

    pub fn read(msg: impl Into<String>) -> Self {
        DaqError::HardwareRead(msg.into())
    }
}

pub type DaqResult<T> = std::result::Result<T, DaqError>;
