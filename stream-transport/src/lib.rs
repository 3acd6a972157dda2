//! # stream-transport
//!
//! The transport boundary consumed by `stream-manager`.
//!
//! A transport multiplexes any number of named media streams over one
//! connection. Consumers ask it to `add` or `remove` a stream by name, and
//! every stream that becomes ready is announced on a single shared
//! [`TrackEvent`] channel, tagged with the stream's identity. Still frames are
//! fetched on demand through a [`FrameRenderer`], independently of whether the
//! live stream is open.
//!
//! ```text
//!   stream-manager (ref-counted handles)
//!         │ add / remove          ▲ track events (all names)
//!         ▼                       │
//!   StreamTransport ──────────────┘
//!   FrameRenderer   ── render_frame(name, mime) ──► Frame
//! ```
//!
//! [`LoopbackTransport`] is an in-process implementation of both traits with
//! call recording and fault injection.

mod error;
mod loopback;
mod transport;
mod types;

pub use error::*;
pub use loopback::*;
pub use transport::*;
pub use types::*;
