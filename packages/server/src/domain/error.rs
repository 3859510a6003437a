//! Domain errors.

use thiserror::Error;

/// Value object validation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueObjectError {
    /// Space name is empty, too long, or contains characters outside `[a-z0-9-]`
    #[error("invalid space name: '{0}'")]
    InvalidSpaceName(String),

    /// Peer ID is empty or too long
    #[error("invalid peer id: '{0}'")]
    InvalidPeerId(String),
}

/// MessagePusher errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessagePushError {
    /// The target client is not registered
    #[error("client '{0}' not found")]
    ClientNotFound(String),

    /// The client's channel is closed
    #[error("push failed: {0}")]
    PushFailed(String),
}

/// Garden store errors
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// The default garden does not exist yet
    #[error("garden not found: {0}")]
    GardenNotFound(String),

    /// Reading the garden file failed
    #[error("failed to read garden: {0}")]
    Io(#[from] std::io::Error),

    /// The garden file is not valid JSON
    #[error("failed to parse garden: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Federation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FederationError {
    /// The peer URL cannot be turned into a WebSocket URL
    #[error("invalid peer url: '{0}'")]
    InvalidPeerUrl(String),

    /// A live (connecting or connected) peer already uses this URL
    #[error("already connected to peer at '{0}'")]
    AlreadyConnected(String),

    /// Opening the outbound connection failed
    #[error("failed to dial peer at '{url}': {reason}")]
    DialFailed { url: String, reason: String },
}
