//! Error types for Temporal-KV

use thiserror::Error;

/// Result type alias for Temporal-KV operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for Temporal-KV
#[derive(Error, Debug)]
pub enum Error {
    /// Engine open, write, or flush failures
    #[error("Storage error: {0}")]
    Storage(String),

    /// Malformed key or value bytes
    #[error("Decode error: {0}")]
    Decode(String),

    /// A key that cannot be represented in the packed layout
    #[error("Encode error: {0}")]
    Encode(String),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Graph node id containing the reserved separator byte
    #[error("Invalid node id: {0}")]
    InvalidNodeId(String),

    /// Write attempted on a store opened read-only
    #[error("Store is read-only")]
    ReadOnly,

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<sled::Error> for Error {
    fn from(e: sled::Error) -> Self {
        Error::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<base64::DecodeError> for Error {
    fn from(e: base64::DecodeError) -> Self {
        Error::Decode(format!("invalid base64: {}", e))
    }
}
