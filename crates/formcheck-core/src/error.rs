//! Error types for the Formcheck engine.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid landmark frame: expected {expected} values, got {actual}")]
    InvalidFrame { expected: usize, actual: usize },

    #[error("Landmark source error: {0}")]
    Source(String),

    #[error("Channel closed: {0}")]
    ChannelClosed(String),

    #[error("Session is not running")]
    SessionNotRunning,

    #[error("Session is already running")]
    SessionAlreadyRunning,

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Timeout after {duration_ms}ms")]
    Timeout { duration_ms: u64 },
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
