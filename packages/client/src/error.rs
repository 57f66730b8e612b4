//! Error types for the relay client.

use thiserror::Error;

/// Client-specific errors
#[derive(Debug, Error)]
pub enum ClientError {
    /// Room name cannot be used as a URL path segment
    #[error("Invalid room '{0}'")]
    InvalidRoom(String),

    /// Connection error
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The server closed the connection
    #[error("Connection closed by server")]
    ConnectionClosed,

    /// Outbound event could not be serialized
    #[error("Failed to serialize event: {0}")]
    Serialization(#[from] serde_json::Error),
}
