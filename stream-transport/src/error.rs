//! Error types for the stream-transport crate.

use crate::types::StreamName;

/// Errors reported by a transport or frame renderer.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    /// The transport could not start delivering the stream
    #[error("Failed to add stream {name}: {reason}")]
    AddFailed {
        /// The stream name
        name: StreamName,
        /// Transport-supplied reason
        reason: String,
    },

    /// The transport could not stop delivering the stream
    #[error("Failed to remove stream {name}: {reason}")]
    RemoveFailed {
        /// The stream name
        name: StreamName,
        /// Transport-supplied reason
        reason: String,
    },

    /// A still frame could not be rendered
    #[error("Failed to render frame for {name}: {reason}")]
    RenderFailed {
        /// The stream name
        name: StreamName,
        /// Renderer-supplied reason
        reason: String,
    },

    /// The underlying connection is gone
    #[error("Transport disconnected")]
    Disconnected,
}

/// Convenience type alias for Results using TransportError.
pub type Result<T> = std::result::Result<T, TransportError>;
