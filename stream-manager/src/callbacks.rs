//! Open/close notification callbacks and frame sinks

use std::fmt;
use std::sync::Arc;

use stream_transport::{Frame, StreamName};

use crate::observable::{Observable, Watcher};

/// Callback invoked with the name of the stream it fired for
pub type StreamCallback = Arc<dyn Fn(&StreamName) + Send + Sync>;

/// Notification targets bound to a handle when it is created
///
/// `on_open` fires every time media for the stream arrives while it is open;
/// `on_close` fires after the transport confirms the stream was removed.
#[derive(Clone, Default)]
pub struct StreamCallbacks {
    on_open: Option<StreamCallback>,
    on_close: Option<StreamCallback>,
}

impl StreamCallbacks {
    /// No callbacks
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the callback fired when media for the stream arrives
    pub fn on_open(mut self, callback: impl Fn(&StreamName) + Send + Sync + 'static) -> Self {
        self.on_open = Some(Arc::new(callback));
        self
    }

    /// Set the callback fired after the stream is closed
    pub fn on_close(mut self, callback: impl Fn(&StreamName) + Send + Sync + 'static) -> Self {
        self.on_close = Some(Arc::new(callback));
        self
    }

    /// Whether neither callback is set
    pub fn is_empty(&self) -> bool {
        self.on_open.is_none() && self.on_close.is_none()
    }

    /// Whether both sets refer to the very same callbacks
    pub fn same_as(&self, other: &StreamCallbacks) -> bool {
        same_callback(&self.on_open, &other.on_open) && same_callback(&self.on_close, &other.on_close)
    }

    pub(crate) fn fire_open(&self, name: &StreamName) {
        if let Some(callback) = &self.on_open {
            callback(name);
        }
    }

    pub(crate) fn fire_close(&self, name: &StreamName) {
        if let Some(callback) = &self.on_close {
            callback(name);
        }
    }
}

fn same_callback(a: &Option<StreamCallback>, b: &Option<StreamCallback>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const (),
        _ => false,
    }
}

impl fmt::Debug for StreamCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamCallbacks")
            .field("on_open", &self.on_open.is_some())
            .field("on_close", &self.on_close.is_some())
            .finish()
    }
}

/// Destination for a rendered still frame
pub trait FrameSink: Send + Sync {
    /// Take ownership of a freshly rendered frame
    fn set_frame(&self, frame: Frame);
}

impl<F> FrameSink for F
where
    F: Fn(Frame) + Send + Sync,
{
    fn set_frame(&self, frame: Frame) {
        self(frame)
    }
}

/// Observable slot holding the last frame delivered to it
///
/// The Rust counterpart of an image element whose source is replaced on
/// every `set_src`.
#[derive(Debug)]
pub struct FrameSlot {
    frame: Observable<Option<Frame>>,
}

impl FrameSlot {
    /// An empty slot
    pub fn new() -> Self {
        Self {
            frame: Observable::new(None),
        }
    }

    /// The last frame delivered, if any
    pub fn get(&self) -> Option<Frame> {
        self.frame.get()
    }

    /// Watch for newly delivered frames
    pub fn watch(&self) -> Watcher<Option<Frame>> {
        self.frame.watch()
    }
}

impl Default for FrameSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameSink for FrameSlot {
    fn set_frame(&self, frame: Frame) {
        self.frame.set(Some(frame));
    }
}
