//! Error types for transport and connection operations.

use std::time::Duration;

use thiserror::Error;

/// Result alias for runtime operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The transport has shut down and can no longer send
    #[error("Transport closed")]
    TransportClosed,

    /// No correlated reply arrived in time
    #[error("Timed out after {0:?} waiting for reply")]
    Timeout(Duration),

    /// The connection dropped the pending request before a reply arrived
    #[error("Reply channel closed before a reply arrived")]
    ChannelClosed,

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}

impl Error {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    /// Returns `true` when the failure means the peer is unreachable.
    pub fn is_disconnect(&self) -> bool {
        matches!(
            self,
            Self::TransportClosed | Self::ChannelClosed | Self::WebSocket(_)
        )
    }
}
