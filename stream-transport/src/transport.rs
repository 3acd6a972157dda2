//! Transport and renderer traits.

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::error::Result;
use crate::types::{Frame, StreamName, TrackEvent};

/// A connection able to start and stop named media streams.
///
/// All streams share one event channel: every call to [`track_events`]
/// returns an independent receiver that sees events for every name, so
/// consumers must filter by [`MediaStream::id`](crate::MediaStream::id).
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` so handles can drive them from any
/// task.
///
/// [`track_events`]: StreamTransport::track_events
#[async_trait]
pub trait StreamTransport: Send + Sync {
    /// Ask the remote end to start delivering `name`.
    async fn add(&self, name: &StreamName) -> Result<()>;

    /// Ask the remote end to stop delivering `name`.
    async fn remove(&self, name: &StreamName) -> Result<()>;

    /// Subscribe to the multiplexed track event channel.
    ///
    /// Dropping the receiver ends the subscription.
    fn track_events(&self) -> broadcast::Receiver<TrackEvent>;
}

/// On-demand source of still frames for a named stream.
///
/// Rendering is independent of the live stream: a frame may be requested for
/// a stream that is not currently added.
#[async_trait]
pub trait FrameRenderer: Send + Sync {
    /// Render one still frame of `name` encoded as `mime_type`.
    async fn render_frame(&self, name: &StreamName, mime_type: &str) -> Result<Frame>;
}
