//! Vocabulary types shared between transports and stream consumers.

use bytes::Bytes;
use std::fmt;

/// Name identifying one stream on a transport.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StreamName(String);

impl StreamName {
    /// Create a new StreamName
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Get the name as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StreamName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StreamName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for StreamName {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl AsRef<str> for StreamName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// An incoming media object delivered by the transport.
///
/// `id` carries the identity of the stream the media belongs to; consumers
/// match it against the name they requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaStream {
    /// Identity of the stream this media belongs to
    pub id: StreamName,
    /// Track identifiers carried by this media object
    pub tracks: Vec<String>,
}

impl MediaStream {
    /// Create a media object for the given stream with the given tracks
    pub fn new(id: impl Into<StreamName>, tracks: Vec<String>) -> Self {
        Self {
            id: id.into(),
            tracks,
        }
    }
}

/// Event announcing that one or more streams are ready.
///
/// Transports are expected to always carry at least one stream; the first
/// stream determines which name the event is for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackEvent {
    /// Streams carried by this event
    pub streams: Vec<MediaStream>,
}

impl TrackEvent {
    /// Create an event carrying the given streams
    pub fn new(streams: Vec<MediaStream>) -> Self {
        Self { streams }
    }

    /// Create an event carrying a single stream
    pub fn single(stream: MediaStream) -> Self {
        Self {
            streams: vec![stream],
        }
    }

    /// The stream that determines which name this event is for
    pub fn first_stream(&self) -> Option<&MediaStream> {
        self.streams.first()
    }
}

/// A single rendered still image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// MIME type of the encoded image, e.g. `image/jpeg`
    pub mime_type: String,
    /// Encoded image bytes
    pub data: Bytes,
}

impl Frame {
    /// Create a new frame
    pub fn new(mime_type: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    /// Size of the encoded image in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the frame carries no image data
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
