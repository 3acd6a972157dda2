//! # Stream Manager
//!
//! Reference-counted lifecycle management for shared, lazily opened media
//! streams such as camera feeds.
//!
//! ## Overview
//!
//! Many independent consumers may ask for the same named stream at the same
//! time. The manager makes sure each stream is opened on the transport at
//! most once, stays open exactly as long as at least one consumer needs it,
//! and is torn down exactly once when the last consumer lets go, however the
//! `add`/`remove` calls overlap.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use stream_manager::prelude::*;
//!
//! let transport = Arc::new(LoopbackTransport::new());
//! let registry = StreamRegistry::for_connection(transport)?;
//!
//! let camera = registry.get_or_create(
//!     "cam1",
//!     StreamCallbacks::new().on_open(|name| println!("{name} is live")),
//! )?;
//!
//! camera.add().await?;                 // first consumer opens the stream
//! let mut media = camera.watch_current();
//! media.changed().await?;              // media arrived
//! camera.remove().await?;              // last consumer closes it
//! ```
//!
//! ## Architecture
//!
//! ```text
//! StreamRegistry (one per transport connection)
//!     │ get_or_create(name)       refresh_all / stop_all
//!     ▼
//! StreamHandle (one per name: refcount, current media, subscription)
//!     │ add / remove              ▲ track events filtered by name
//!     ▼                           │
//! stream-transport (StreamTransport + FrameRenderer)
//! ```
//!
//! This is the reference-counted observable pattern: the transport is only
//! engaged on the `0 -> 1` and `1 -> 0` edges of a handle's refcount.

pub mod callbacks;
pub mod config;
pub mod error;
pub mod handle;
pub mod logging;
pub mod observable;
pub mod registry;

pub use callbacks::{FrameSink, FrameSlot, StreamCallback, StreamCallbacks};
pub use config::{ManagerConfig, RebindPolicy};
pub use error::{BulkError, BulkOperation, Result, StreamError};
pub use handle::{StreamHandle, StreamPhase};
pub use observable::{Observable, Watcher};
pub use registry::StreamRegistry;

// Re-export the transport vocabulary consumers need
pub use stream_transport::{
    Frame, FrameRenderer, LoopbackTransport, MediaStream, StreamName, StreamTransport,
    TrackEvent, TransportError,
};

/// Prelude module for convenient imports
///
/// ```rust
/// use stream_manager::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        Frame, FrameSink, FrameSlot, LoopbackTransport, ManagerConfig, MediaStream, Result,
        StreamCallbacks, StreamError, StreamHandle, StreamName, StreamRegistry, TrackEvent,
        Watcher,
    };
}
