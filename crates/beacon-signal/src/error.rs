//! Error types for the relay core.

use thiserror::Error;

/// Relay errors.
#[derive(Debug, Error)]
pub enum SignalError {
    /// Inbound message could not be parsed as an envelope
    #[error("Malformed envelope: {0}")]
    MalformedEnvelope(#[from] serde_json::Error),

    /// Outbound channel to a connection is closed
    #[error("Outbound channel closed")]
    ChannelClosed,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal relay error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SignalError {
    /// Create a new configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
