//! Error types for the threshold client.

use thiserror::Error;

/// Client-specific errors
#[derive(Debug, Error)]
pub enum ClientError {
    /// Opening the connection failed
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The server went away mid-session
    #[error("Connection lost")]
    ConnectionLost,

    /// Every reconnection attempt failed
    #[error("Failed to reconnect after {0} attempts")]
    ReconnectExhausted(u32),
}
