use std::fmt;

use stream_transport::{StreamName, TransportError};
use thiserror::Error;

/// Errors that can occur while managing streams
#[derive(Error, Debug)]
pub enum StreamError {
    /// The transport failed to add or remove a stream
    #[error("Transport failure for stream {name}: {source}")]
    Transport {
        name: StreamName,
        #[source]
        source: TransportError,
    },

    /// A track event arrived carrying no streams
    #[error("Track event for stream {name} carried no streams")]
    EmptyTrackEvent { name: StreamName },

    /// Callbacks were supplied for a stream whose callbacks are already bound
    #[error("Callbacks for stream {name} are already bound")]
    CallbacksAlreadyBound { name: StreamName },

    /// One or more streams failed during a bulk operation
    #[error("{0}")]
    Bulk(BulkError),

    /// The value behind a watcher is gone
    #[error("Watcher has been closed")]
    WatcherClosed,

    /// A lifecycle sequence task ended without finishing, e.g. on runtime
    /// shutdown
    #[error("Lifecycle sequence aborted: {0}")]
    SequenceAborted(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl StreamError {
    pub(crate) fn transport(name: &StreamName, source: TransportError) -> Self {
        StreamError::Transport {
            name: name.clone(),
            source,
        }
    }

    /// Whether this error means the transport broke its event contract
    pub fn is_protocol_violation(&self) -> bool {
        matches!(self, StreamError::EmptyTrackEvent { .. })
    }

    /// The stream this error concerns, if it concerns exactly one
    pub fn stream_name(&self) -> Option<&StreamName> {
        match self {
            StreamError::Transport { name, .. }
            | StreamError::EmptyTrackEvent { name }
            | StreamError::CallbacksAlreadyBound { name } => Some(name),
            _ => None,
        }
    }
}

/// Bulk operations run across every active stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkOperation {
    /// Re-running the open sequence after a reconnect
    Refresh,
    /// Running the close sequence on teardown or suspend
    Stop,
}

impl fmt::Display for BulkOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BulkOperation::Refresh => f.write_str("refresh"),
            BulkOperation::Stop => f.write_str("stop"),
        }
    }
}

/// Every failure collected from one bulk operation
#[derive(Debug)]
pub struct BulkError {
    pub operation: BulkOperation,
    pub failures: Vec<(StreamName, StreamError)>,
}

impl BulkError {
    /// Names of the streams that failed
    pub fn failed_names(&self) -> Vec<&StreamName> {
        self.failures.iter().map(|(name, _)| name).collect()
    }
}

impl fmt::Display for BulkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} failed for {} stream(s):",
            self.operation,
            self.failures.len()
        )?;
        for (name, error) in &self.failures {
            write!(f, " [{}: {}]", name, error)?;
        }
        Ok(())
    }
}

impl std::error::Error for BulkError {}

/// Result type for stream manager operations
pub type Result<T> = std::result::Result<T, StreamError>;
